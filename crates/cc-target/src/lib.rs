//! The codegen interface and its per-architecture implementations: the
//! boundary `cc-codegen` compiles against without knowing which concrete
//! machine code comes out the other side.

pub mod backend;
pub mod emit;
pub mod x86;
pub mod x64;

pub use backend::{CmpKind, CodeBuffer, JumpKind, JumpSlot, TargetBackend, VReg};
pub use x64::X64Backend;
pub use x86::X86Backend;
