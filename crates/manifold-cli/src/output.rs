use std::io::{self, Write};
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::json;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use manifold_core::ManifoldError;

static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn init(json: bool) {
    let _ = JSON_MODE.set(json);
}

pub fn is_json() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

pub fn stdout() -> StandardStream {
    StandardStream::stdout(ColorChoice::Auto)
}

/// Bold line introducing a section of human output.
pub fn heading(out: &mut StandardStream, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "{text}")?;
    out.reset()
}

/// `ok` / `FAIL` tag followed by a message.
pub fn status(out: &mut StandardStream, ok: bool, text: &str) -> io::Result<()> {
    let (color, tag) = if ok { (Color::Green, "ok") } else { (Color::Red, "FAIL") };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{tag:>4}")?;
    out.reset()?;
    writeln!(out, " {text}")
}

/// Report a failed command. Descriptor errors keep their machine code.
pub fn error(e: &anyhow::Error) {
    if is_json() {
        let body = match e.downcast_ref::<ManifoldError>() {
            Some(m) => m.to_json(),
            None => json!({"code": "ERROR", "message": format!("{e:#}")}),
        };
        let _ = print_json(&json!({ "error": body }));
        return;
    }

    let mut err = StandardStream::stderr(ColorChoice::Auto);
    let _ = err.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(err, "error");
    let _ = err.reset();
    let code = e
        .downcast_ref::<ManifoldError>()
        .map(|m| format!(" [{}]", m.code()))
        .unwrap_or_default();
    let _ = writeln!(err, "{code}: {e:#}");
}
