use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kissdigi_ax25::{Ax25Frame, CommandResponse, Tnc2};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    schema_id: &'a str,
    port: u8,
    source: String,
    destination: String,
    path: Vec<String>,
    control: u8,
    pid: u8,
    command: &'a str,
    info_size: usize,
    info: String,
    tnc2: String,
    timestamp: String,
}

/// Print one decoded frame heard on TNC `port`.
pub fn print_frame(frame: &Ax25Frame, port: u8, format: OutputFormat) {
    let header = &frame.header;
    let info = info_text(frame.info.as_ref());
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                schema_id: "https://schemas.3leaps.dev/kissdigi/cli/v1/frame-received.schema.json",
                port,
                source: header.source.to_string(),
                destination: header.destination.to_string(),
                path: header.via.iter().map(ToString::to_string).collect(),
                control: header.control,
                pid: header.pid,
                command: command_name(header.command),
                info_size: frame.info.len(),
                info,
                tnc2: frame.to_string(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let path: Vec<String> = header.via.iter().map(ToString::to_string).collect();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "FROM", "TO", "PATH", "INFO"])
                .add_row(vec![
                    port.to_string(),
                    header.source.to_string(),
                    header.destination.to_string(),
                    path.join(","),
                    info,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = Tnc2 {
                header,
                info: frame.info.as_ref(),
            };
            println!("[{port}] {line}");
        }
        OutputFormat::Raw => {
            print_raw(&frame.encode());
        }
    }
}

/// Print a serializable summary (run stats, config).
pub fn print_value<T: Serialize>(schema_id: &str, value: &T, format: OutputFormat) {
    let mut json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            if let serde_json::Value::Object(map) = &mut json {
                map.insert("schema_id".into(), schema_id.into());
            }
            println!(
                "{}",
                serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            if let serde_json::Value::Object(map) = json {
                for (key, value) in map {
                    let value = match value {
                        serde_json::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    table.add_row(vec![key, value]);
                }
            }
            println!("{table}");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn command_name(command: CommandResponse) -> &'static str {
    match command {
        CommandResponse::Legacy => "legacy",
        CommandResponse::Command => "command",
        CommandResponse::Response => "response",
    }
}

fn info_text(info: &[u8]) -> String {
    match std::str::from_utf8(info) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", info.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
