//! `#include` / `#define` / conditional preprocessing.
//!
//! The core compiler's only contract with this pass (spec §1/§6) is:
//! "yields a single concatenated source string." Internally this is a
//! small line-oriented state machine — directives are always whole lines
//! in the supported subset, so recognizing them doesn't need the full
//! expression grammar the parser has; it needs a cheap scan for `#` at the
//! start of a (whitespace-trimmed) line, mirroring `original_source/pre.c`'s
//! token-at-a-time directive dispatch without carrying its token-buffer
//! machinery into a part of the pipeline that doesn't need it.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("{path}: {reason}")]
    Io { path: String, reason: String },
    #[error("{path}:{line}: include file not found: {target}")]
    IncludeNotFound { path: String, line: u32, target: String },
    #[error("{path}:{line}: malformed #{directive} directive")]
    MalformedDirective { path: String, line: u32, directive: String },
    #[error("{path}:{line}: #endif without matching #if")]
    UnmatchedEndif { path: String, line: u32 },
    #[error("{path}: unterminated conditional block (missing #endif)")]
    UnterminatedConditional { path: String },
    #[error("include depth exceeded 200 (likely a cyclic #include)")]
    IncludeTooDeep,
}

pub type PreprocessResult<T> = Result<T, PreprocessError>;

#[derive(Debug, Clone)]
enum Macro {
    Object(String),
    Function { params: Vec<String>, body: String },
}

/// Preprocessor state threaded through a (possibly recursive, via
/// `#include`) preprocessing run.
struct Context<'a> {
    include_paths: &'a [PathBuf],
    defines: FxHashMap<String, Macro>,
    depth: u32,
}

/// `preprocess(path, include_paths, defines) -> text | error` (spec §6).
pub fn preprocess(
    path: impl AsRef<Path>,
    include_paths: &[PathBuf],
    defines: &[(String, String)],
) -> PreprocessResult<String> {
    let mut ctx = Context { include_paths, defines: FxHashMap::default(), depth: 0 };
    for (name, value) in defines {
        ctx.defines.insert(name.clone(), Macro::Object(value.clone()));
    }
    process_file(&mut ctx, path.as_ref())
}

fn read_file(path: &Path) -> PreprocessResult<String> {
    std::fs::read_to_string(path).map_err(|e| PreprocessError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn process_file(ctx: &mut Context, path: &Path) -> PreprocessResult<String> {
    ctx.depth += 1;
    if ctx.depth > 200 {
        return Err(PreprocessError::IncludeTooDeep);
    }
    let source = read_file(path)?;
    let dir = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let result = process_text(ctx, path, &dir, &source);
    ctx.depth -= 1;
    result
}

fn process_text(ctx: &mut Context, path: &Path, dir: &Path, source: &str) -> PreprocessResult<String> {
    let mut out = String::with_capacity(source.len());
    // Stack of (currently active, ever taken a branch) for nested #ifdef.
    let mut cond_stack: Vec<(bool, bool)> = Vec::new();
    let path_str = path.display().to_string();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let trimmed = raw_line.trim_start();
        let active = cond_stack.iter().all(|(a, _)| *a);

        if let Some(rest) = trimmed.strip_prefix('#') {
            let rest = rest.trim_start();
            let (directive, args) = split_directive(rest);
            match directive {
                "include" if active => {
                    let target = parse_include_target(args).ok_or_else(|| {
                        PreprocessError::MalformedDirective {
                            path: path_str.clone(),
                            line: line_no,
                            directive: "include".into(),
                        }
                    })?;
                    let resolved = locate_include(dir, ctx.include_paths, &target).ok_or_else(|| {
                        PreprocessError::IncludeNotFound {
                            path: path_str.clone(),
                            line: line_no,
                            target: target.clone(),
                        }
                    })?;
                    out.push_str(&process_file(ctx, &resolved)?);
                    out.push('\n');
                }
                "include" => {}
                "define" if active => {
                    define_macro(ctx, args);
                }
                "define" => {}
                "undef" if active => {
                    ctx.defines.remove(args.trim());
                }
                "undef" => {}
                "ifdef" => {
                    let known = active && ctx.defines.contains_key(args.trim());
                    cond_stack.push((known, known));
                }
                "ifndef" => {
                    let known = active && !ctx.defines.contains_key(args.trim());
                    cond_stack.push((known, known));
                }
                "else" => {
                    if cond_stack.is_empty() {
                        return Err(PreprocessError::UnmatchedEndif { path: path_str.clone(), line: line_no });
                    }
                    let depth = cond_stack.len();
                    let parent_active = cond_stack[..depth - 1].iter().all(|(a, _)| *a);
                    let top = &mut cond_stack[depth - 1];
                    top.0 = parent_active && !top.1;
                    top.1 = true;
                }
                "endif" => {
                    if cond_stack.pop().is_none() {
                        return Err(PreprocessError::UnmatchedEndif { path: path_str.clone(), line: line_no });
                    }
                }
                _ => {
                    // Unknown directives are concatenated verbatim when
                    // active, matching spec's "no macro expansion fidelity
                    // beyond concatenation" stance.
                    if active {
                        out.push_str(raw_line);
                        out.push('\n');
                    }
                }
            }
            continue;
        }

        if active {
            out.push_str(&expand_macros(ctx, raw_line));
            out.push('\n');
        }
    }

    if !cond_stack.is_empty() {
        return Err(PreprocessError::UnterminatedConditional { path: path_str });
    }

    Ok(out)
}

fn split_directive(rest: &str) -> (&str, &str) {
    match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim_start()),
        None => (rest, ""),
    }
}

fn parse_include_target(args: &str) -> Option<String> {
    let args = args.trim();
    if let Some(inner) = args.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Some(inner.to_string());
    }
    if let Some(inner) = args.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return Some(inner.to_string());
    }
    None
}

fn locate_include(source_dir: &Path, include_paths: &[PathBuf], target: &str) -> Option<PathBuf> {
    let local = source_dir.join(target);
    if local.is_file() {
        return Some(local);
    }
    for base in include_paths {
        let candidate = base.join(target);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn define_macro(ctx: &mut Context, args: &str) {
    let args = args.trim();
    let (name_and_params, body) = match args.find(char::is_whitespace) {
        Some(i) => (&args[..i], args[i..].trim_start()),
        None => (args, ""),
    };

    if let Some(paren) = name_and_params.find('(') {
        if name_and_params.ends_with(')') {
            let name = name_and_params[..paren].to_string();
            let params: Vec<String> = name_and_params[paren + 1..name_and_params.len() - 1]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            ctx.defines.insert(name, Macro::Function { params, body: body.to_string() });
            return;
        }
    }

    ctx.defines.insert(name_and_params.to_string(), Macro::Object(body.to_string()));
}

/// Single-pass, non-recursive substitution: object-like macros are
/// replaced by their body; function-like macros consume a parenthesized
/// argument list and substitute each parameter occurrence. This matches
/// spec §6's "no macro expansion fidelity is required ... beyond
/// concatenation" — nested macro-producing-macro expansion is not attempted.
fn expand_macros(ctx: &Context, line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i] as char == '_' || (bytes[i] as char).is_alphanumeric()) {
                i += 1;
            }
            let word = &line[start..i];
            match ctx.defines.get(word) {
                Some(Macro::Object(body)) => out.push_str(body),
                Some(Macro::Function { params, body }) => {
                    let mut j = i;
                    while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j] as char == '(' {
                        if let Some((args, end)) = split_call_args(&line[j..]) {
                            out.push_str(&substitute_params(body, params, &args));
                            i = j + end;
                            continue;
                        }
                    }
                    out.push_str(word);
                }
                None => out.push_str(word),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn split_call_args(s: &str) -> Option<(Vec<String>, usize)> {
    debug_assert!(s.starts_with('('));
    let mut depth = 0i32;
    let mut args = Vec::new();
    let mut cur = String::new();
    for (idx, c) in s.char_indices() {
        match c {
            '(' => {
                depth += 1;
                if depth > 1 {
                    cur.push(c);
                }
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let arg = cur.trim().to_string();
                    if !arg.is_empty() || !args.is_empty() {
                        args.push(arg);
                    }
                    return Some((args, idx + 1));
                }
                cur.push(c);
            }
            ',' if depth == 1 => {
                args.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(c),
        }
    }
    None
}

fn substitute_params(body: &str, params: &[String], args: &[String]) -> String {
    let mut out = String::with_capacity(body.len());
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i] as char == '_' || (bytes[i] as char).is_alphanumeric()) {
                i += 1;
            }
            let word = &body[start..i];
            if let Some(pos) = params.iter().position(|p| p == word) {
                out.push_str(args.get(pos).map(String::as_str).unwrap_or(""));
            } else {
                out.push_str(word);
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn concatenates_quoted_include() {
        let dir = tempfile::tempdir().unwrap();
        write_temp(dir.path(), "util.h", "int helper() { return 1; }\n");
        let main = write_temp(dir.path(), "main.c", "#include \"util.h\"\nint main() { return helper(); }\n");
        let text = preprocess(&main, &[], &[]).unwrap();
        assert!(text.contains("int helper() { return 1; }"));
        assert!(text.contains("int main() { return helper(); }"));
    }

    #[test]
    fn object_like_define_substitutes() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_temp(dir.path(), "main.c", "#define WIDTH 80\nint w = WIDTH;\n");
        let text = preprocess(&main, &[], &[]).unwrap();
        assert!(text.contains("int w = 80;"));
    }

    #[test]
    fn function_like_define_substitutes_params() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_temp(dir.path(), "main.c", "#define ADD(a, b) a + b\nint x = ADD(1, 2);\n");
        let text = preprocess(&main, &[], &[]).unwrap();
        assert!(text.contains("int x = 1 + 2;"));
    }

    #[test]
    fn ifdef_hides_inactive_block() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_temp(
            dir.path(),
            "main.c",
            "#ifdef DEBUG\nint debug_only() { return 1; }\n#endif\nint main() { return 0; }\n",
        );
        let text = preprocess(&main, &[], &[]).unwrap();
        assert!(!text.contains("debug_only"));
        assert!(text.contains("int main()"));
    }

    #[test]
    fn ifdef_else_picks_active_branch() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_temp(
            dir.path(),
            "main.c",
            "#define RELEASE\n#ifdef RELEASE\nint a = 1;\n#else\nint a = 2;\n#endif\n",
        );
        let text = preprocess(&main, &[], &[]).unwrap();
        assert!(text.contains("int a = 1;"));
        assert!(!text.contains("int a = 2;"));
    }

    #[test]
    fn missing_include_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_temp(dir.path(), "main.c", "#include \"missing.h\"\n");
        let err = preprocess(&main, &[], &[]).unwrap_err();
        assert!(matches!(err, PreprocessError::IncludeNotFound { .. }));
    }

    #[test]
    fn unterminated_conditional_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_temp(dir.path(), "main.c", "#ifdef X\nint a;\n");
        let err = preprocess(&main, &[], &[]).unwrap_err();
        assert!(matches!(err, PreprocessError::UnterminatedConditional { .. }));
    }
}
