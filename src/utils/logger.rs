use std::error::Error;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use backtrace::Backtrace;
use serde::Serialize;
use slog::{error, o, Drain, Logger};

#[derive(Serialize, Debug)]
pub struct StackFrame {
    func: String,
    source: String,
    line: u32,
}

/// Captures the current backtrace as a list of compact frames.
fn marshal_stack() -> Option<Vec<StackFrame>> {
    let bt = Backtrace::new();
    let mut frames = Vec::new();

    for frame in bt.frames() {
        for symbol in frame.symbols() {
            let func = symbol
                .name()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_owned());
            let source = symbol
                .filename()
                .and_then(|p| p.to_str())
                .map(|s| {
                    // Keep only the last two path components.
                    let path = Path::new(s);
                    if let (Some(parent), Some(file)) = (path.parent(), path.file_name()) {
                        format!(
                            "{}/{}",
                            parent.file_name().unwrap_or_default().to_string_lossy(),
                            file.to_string_lossy()
                        )
                    } else {
                        s.to_owned()
                    }
                })
                .unwrap_or_else(|| "unknown".to_owned());
            let line = symbol.lineno().unwrap_or(0);

            frames.push(StackFrame { func, source, line });
        }
    }
    if frames.is_empty() { None } else { Some(frames) }
}

/// Emits an error record with the error message and, when available, a
/// stack trace.
pub fn log_error(logger: &Logger, context: &str, err: &(dyn Error + 'static)) {
    let stack_trace = marshal_stack()
        .map(|frames| format!("{:?}", frames))
        .unwrap_or_default();
    error!(logger, "{}", context; "error" => err.to_string(), "stack_trace" => stack_trace);
}

/// Returns a JSON logger writing to stdout.
pub fn get_logger() -> Logger {
    let drain = slog_json::Json::default(io::stdout()).fuse();
    let drain = Mutex::new(drain).fuse();
    Logger::root(drain, o!())
}
