//! Top-level pipeline wiring: preprocessor -> lexer -> parser -> codegen ->
//! target backend -> resolver -> image emitter (spec §2 "System Overview").
//!
//! Mirrors `original_source/main.c`'s own top-to-bottom wiring (preprocess
//! one file, tokenize, parse, pick a `codegen_t` table, compile, build the
//! selected image) but as an explicit `Result`-returning function instead
//! of one long `main` body with early `return 1;`s (spec §9's "long-jump
//! error unwinding" redesign note: "replace with a result-propagating
//! return type at every pass entry point").

pub mod ast_dump;
pub mod cli;
pub mod diagnostics;

use cc_ast::{NodeArena, NodeId, NullResolver, SymbolResolver};
use cc_codegen::{codegen, CodegenOptions, CompiledModule, TargetKind};
use cc_resolver::{ImportResolver, MemoryResolver};
use cc_target::{TargetBackend, X64Backend, X86Backend};
use cli::{BuildTarget, Cli};
use diagnostics::Stage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    Preprocess(#[from] cc_preprocessor::PreprocessError),
    #[error("{0}")]
    Lex(String),
    #[error("{0}")]
    Parse(#[from] cc_parser::ParseError),
    #[error("{0}")]
    Codegen(#[from] cc_codegen::CodegenError),
    #[error("{0}")]
    Emit(#[from] cc_image::EmitError),
    #[error("{0}")]
    Resolver(#[from] cc_resolver::ResolverError),
    #[error("{reason}")]
    Io { reason: String },
}

impl DriverError {
    /// Which stage produced this error, for spec §7's one-line report.
    pub fn stage(&self) -> Stage {
        match self {
            DriverError::Preprocess(_) => Stage::Preprocess,
            DriverError::Lex(_) => Stage::Lex,
            DriverError::Parse(_) => Stage::Parse,
            DriverError::Codegen(_) => Stage::Codegen,
            DriverError::Emit(_) | DriverError::Resolver(_) => Stage::Emit,
            DriverError::Io { .. } => Stage::Emit,
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            DriverError::Parse(e) => Some(e.line),
            _ => None,
        }
    }
}

/// Outcome of a `run()` call that didn't already print its own output
/// (the `-a`/`-i` dumps write directly and return `Finished`).
pub enum Outcome {
    /// An image was built and, for file targets, written to `path`.
    Built { path: Option<PathBuf> },
    /// `-bmemory` ran the program in-process; this is its return value.
    Ran { status: i32 },
    /// `-a`/`-i` already printed everything there is to print.
    Dumped,
}

/// Runs the whole pipeline for one `Cli` invocation.
pub fn run(cli: &Cli) -> Result<Outcome, DriverError> {
    let (sources, output) = cli.split_paths();
    let src_path = sources.first().copied().unwrap_or_default();

    if cli.verbose {
        diagnostics::report_progress(&format!("preprocessing {src_path}"));
    }
    let include_dir = std::path::Path::new(src_path)
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let text = cc_preprocessor::preprocess(src_path, &[include_dir], &[])?;

    if cli.verbose {
        diagnostics::report_progress("lexing");
    }
    let tokens = cc_lexer::lex(&text, cc_lexer::LexFlags::default())
        .map_err(|errors| DriverError::Lex(errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")))?;

    if cli.verbose {
        diagnostics::report_progress("parsing");
    }
    let (root, arena) = cc_parser::parse(&tokens).map_err(|e| {
        diagnostics::report_source_snippet(src_path, &text, e.span, &e.message);
        DriverError::from(e)
    })?;

    if cli.dump_ast {
        print!("{}", ast_dump::dump(&arena, root));
        return Ok(Outcome::Dumped);
    }

    if cli.verbose {
        diagnostics::report_progress("generating code");
    }
    let (mut module, word_size) = compile(&arena, root, cli).map_err(|e| {
        if let DriverError::Codegen(codegen_err) = &e {
            if let Some(span) = codegen_error_span(&arena, codegen_err) {
                diagnostics::report_source_snippet(src_path, &text, span, &codegen_err.to_string());
            }
        }
        e
    })?;

    if cli.dump_instructions {
        dump_instructions_to_stdout(&module.code);
        return Ok(Outcome::Dumped);
    }

    if cli.verbose {
        diagnostics::report_progress("building image");
    }
    build_image(&mut module, word_size, cli, output.map(PathBuf::from))
}

/// Picks a backend + resolver from the CLI's target selection, then runs
/// `cc_codegen::codegen`. Returns the backend's word size alongside the
/// module since `build_image` needs it to choose ELF32 vs. ELF64.
fn compile(arena: &NodeArena, root: NodeId, cli: &Cli) -> Result<(CompiledModule, u32), DriverError> {
    let target = match cli.build_target {
        BuildTarget::Windows => TargetKind::Windows,
        BuildTarget::Linux => TargetKind::Linux,
        BuildTarget::Memory => TargetKind::Memory,
        BuildTarget::Opcodes => TargetKind::Opcodes,
    };
    let options = CodegenOptions { target, debug_breakpoints: cli.debug_breakpoints };

    // The memory target always runs on this host, so it always takes the
    // host's own word size rather than a selectable one (spec §4.4: the
    // memory target is an in-process `mmap`, not a cross-architecture
    // file format). The Windows target is pinned to the 32-bit backend
    // unconditionally: `cc_image::build_pe` only ever writes a PE32 header
    // (`IMAGE_OPTIONAL_HEADER32`, machine `0x14c`, spec §6) — there is no
    // PE32+ builder, so handing it 64-bit `X64Backend` code would produce a
    // file whose header lies about the machine code it contains. Every
    // other file target honors `--arch32`.
    let use_x86 = cli.build_target == BuildTarget::Windows
        || (cli.arch32 && cli.build_target != BuildTarget::Memory);

    if cli.build_target == BuildTarget::Memory {
        let mut resolver = MemoryResolver::new(&cli.libraries)?;
        let mut backend = X64Backend::new();
        let module = codegen(arena, root, &mut backend, &mut resolver, options)?;
        return Ok((module, backend.word_size()));
    }

    if cli.libraries.is_empty() {
        let mut resolver = NullResolver::default();
        run_with_backend(arena, root, &mut resolver, options, use_x86)
    } else {
        let mut resolver = ImportResolver::new(&cli.libraries);
        run_with_backend(arena, root, &mut resolver, options, use_x86)
    }
}

/// Looks up the source span for the node a `CodegenError` blames, when it
/// names one — `UnknownFunction`/`DuplicateFunction`/`DuplicateVariable`
/// carry only names, since a call site or a second declaration can't be
/// pinned to one node without more plumbing than spec §7's one-line report
/// needs.
fn codegen_error_span(arena: &NodeArena, err: &cc_codegen::CodegenError) -> Option<cc_ast::Span> {
    use cc_codegen::CodegenError::*;
    let node = match err {
        UnknownIdentifier { node, .. } => *node,
        TypeMismatch { node, .. } => *node,
        OperandSizeUnknown { node, .. } => *node,
        UnsupportedConstruct { node, .. } => *node,
        UnknownFunction { .. } | DuplicateVariable { .. } | DuplicateFunction { .. } => return None,
    };
    Some(arena.get(node).span)
}

fn run_with_backend(
    arena: &NodeArena,
    root: NodeId,
    resolver: &mut dyn SymbolResolver,
    options: CodegenOptions,
    use_x86: bool,
) -> Result<(CompiledModule, u32), DriverError> {
    if use_x86 {
        let mut backend = X86Backend::new();
        let module = codegen(arena, root, &mut backend, resolver, options)?;
        Ok((module, backend.word_size()))
    } else {
        let mut backend = X64Backend::new();
        let module = codegen(arena, root, &mut backend, resolver, options)?;
        Ok((module, backend.word_size()))
    }
}

fn build_image(
    module: &mut CompiledModule,
    word_size: u32,
    cli: &Cli,
    output: Option<PathBuf>,
) -> Result<Outcome, DriverError> {
    match cli.build_target {
        BuildTarget::Memory => {
            let status = cc_image::execute(module)?;
            Ok(Outcome::Ran { status })
        }
        BuildTarget::Windows => {
            let bytes = cc_image::build_pe(module)?;
            write_output(&bytes, output)
        }
        BuildTarget::Linux if word_size == 4 => {
            let bytes = cc_image::build_elf32(module)?;
            write_output(&bytes, output)
        }
        BuildTarget::Linux => {
            let bytes = cc_image::build_elf64(module)?;
            write_output(&bytes, output)
        }
        BuildTarget::Opcodes => {
            let data_offset = module.code.len() as u32;
            cc_image::apply_opcode_relocations(&mut module.code, &module.relocations, data_offset)?;
            let mut bytes = std::mem::take(&mut module.code);
            bytes.extend_from_slice(&module.data);
            write_output(&bytes, output)
        }
    }
}

fn write_output(bytes: &[u8], output: Option<PathBuf>) -> Result<Outcome, DriverError> {
    let path = output.ok_or_else(|| DriverError::Io { reason: "a file target requires an output path".into() })?;
    std::fs::write(&path, bytes).map_err(|e| DriverError::Io { reason: format!("{}: {e}", path.display()) })?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(&path) {
            let mut perms = metadata.permissions();
            perms.set_mode(perms.mode() | 0o111);
            let _ = std::fs::set_permissions(&path, perms);
        }
    }
    Ok(Outcome::Built { path: Some(path) })
}

/// `-i`: "print machine-code bytes to stdout" (spec §6), od-style
/// space-separated hex pairs, matching `original_source/main.c`'s
/// `OPT_INSTR` branch — printed before any relocation is applied, exactly
/// as the original does.
fn dump_instructions_to_stdout(code: &[u8]) {
    use std::io::Write;
    let mut stdout = std::io::stdout().lock();
    for (i, byte) in code.iter().enumerate() {
        let sep = if i + 1 == code.len() { "" } else { " " };
        let _ = write!(stdout, "{byte:02X}{sep}");
    }
    let _ = writeln!(stdout);
}
