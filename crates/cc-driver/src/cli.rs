//! Flag surface (spec §6's CLI table): `ccvm [-a] [-i] [-d] [-v]
//! [-b{windows,linux,memory,opcodes}] [-l<name>]... <inputs...> <output>`.
//!
//! The original tool reads `argv` by hand (`original_source/main.c`'s
//! `argv[i][0]=='-'` switch); here the same flat, no-subcommand shape is
//! expressed with `clap`'s derive macros the way `raya-cli` uses them
//! elsewhere in this workspace, just without a `Subcommand` — ccvm only
//! ever does one thing.

use clap::{Parser, ValueEnum};

/// spec §6's `-b` choice. `Linux` additionally needs a word-size decision
/// the original CLI never exposed (its `"linux"` string always meant
/// `BT_LINUX_X64`, `main.c:131`) — `--arch32` recovers the otherwise
/// unreachable 32-bit Linux target without disturbing the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildTarget {
    Windows,
    Linux,
    Memory,
    Opcodes,
}

#[derive(Parser, Debug)]
#[command(name = "ccvm")]
#[command(about = "Compiles a small C subset straight to machine code")]
#[command(version)]
pub struct Cli {
    /// Dump the parsed AST and stop before codegen.
    #[arg(short = 'a')]
    pub dump_ast: bool,

    /// Print the compiled machine code bytes to stdout instead of building
    /// an image.
    #[arg(short = 'i')]
    pub dump_instructions: bool,

    /// Lower `int3()` calls to a real breakpoint instruction instead of a
    /// `nop`.
    #[arg(short = 'd')]
    pub debug_breakpoints: bool,

    /// Print one progress line per pipeline stage.
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Which image target to build for. Defaults to `linux` (ELF64),
    /// matching `original_source/main.c`'s `BT_LINUX_X64` default.
    #[arg(short = 'b', long = "build", value_enum, default_value = "linux")]
    pub build_target: BuildTarget,

    /// Forces the 32-bit (`X86Backend`/ELF32) Linux target instead of the
    /// 64-bit default. Only meaningful with `-blinux`; this crate's own
    /// addition, recorded in DESIGN.md — the original CLI's string parser
    /// never reached `BT_LINUX_X86` at all.
    #[arg(long = "arch32")]
    pub arch32: bool,

    /// Load a native library's exported symbols into the resolver
    /// (`-lname`), repeatable. Only consulted by the memory target.
    #[arg(short = 'l', value_name = "name")]
    pub libraries: Vec<String>,

    /// Input source file(s) followed by the output path. The memory target
    /// takes no output path (spec §6: "`-bmemory` ... runs the compiled
    /// code directly"); every other target requires one.
    #[arg(required = true)]
    pub paths: Vec<String>,
}

impl Cli {
    /// Splits the trailing positional argument list into source files and
    /// (for file targets) an output path, mirroring `main.c`'s
    /// `files[numfiles - 1]` / `files[numfiles - 2]` split.
    pub fn split_paths(&self) -> (Vec<&str>, Option<&str>) {
        if self.build_target == BuildTarget::Memory {
            return (self.paths.iter().map(String::as_str).collect(), None);
        }
        match self.paths.split_last() {
            Some((out, sources)) => (sources.iter().map(String::as_str).collect(), Some(out.as_str())),
            None => (Vec::new(), None),
        }
    }
}
