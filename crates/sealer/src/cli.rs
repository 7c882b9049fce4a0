//! Command-line surface: argument parsing, dispatch by content kind, reporting.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use common::{
    protocol::{ErrorReport, OperationReport},
    SealError,
};
use tracing::info;

use crate::classify::{ClassifierChain, ContentKind};
use crate::config::Config;
use crate::convert;
use crate::key::{KeyStore, SymmetricKey, KEY_LEN};
use crate::pipeline::Pipeline;

/// Normalise structured files to JSON and seal them in AES-256-GCM envelopes.
#[derive(Debug, Parser)]
#[command(name = "sealer", version)]
pub struct Cli {
    /// Key file to use instead of `SEALER_KEY_PATH`.
    #[arg(long, global = true, value_name = "PATH")]
    pub key_file: Option<PathBuf>,

    /// Context string bound into the authentication tag; decrypt needs the same value.
    #[arg(long, global = true, value_name = "STRING")]
    pub context: Option<String>,

    /// Print the result as a JSON report.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt a PDF, or convert CSV/XML/text to JSON and encrypt it.
    Encrypt {
        /// File to protect.
        input: PathBuf,
        /// Where to write the envelope.
        output: PathBuf,
    },
    /// Verify and decrypt an envelope.
    Decrypt {
        /// Envelope produced by `encrypt`.
        input: PathBuf,
        /// Where to write the recovered bytes.
        output: PathBuf,
    },
    /// Create the key file.
    Keygen {
        /// Replace an existing key. Envelopes sealed with it become unrecoverable.
        #[arg(long)]
        force: bool,
    },
}

/// Execute the parsed command.
///
/// # Errors
///
/// Any [`SealError`]; unsupported inputs are rejected before a key is loaded.
pub fn run(cli: &Cli, cfg: &Config) -> Result<OperationReport, SealError> {
    let store = KeyStore::new(
        cli.key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&cfg.key_path)),
    );

    match &cli.command {
        Command::Encrypt { input, output } => {
            let kind = classify(input)?;
            let kind = match kind {
                Some(ContentKind::Envelope) => {
                    return Err(SealError::Unsupported(format!(
                        "{} is already an envelope",
                        input.display()
                    )))
                }
                Some(kind) => kind,
                None => {
                    return Err(SealError::Unsupported(format!(
                        "unsupported file type: {}",
                        input.display()
                    )))
                }
            };
            let output = resolve_output(cfg, output)?;
            let key = store.load_or_create()?;
            let pipeline = build_pipeline(cli, cfg, &key);

            let bytes_written = if kind.is_structured() {
                let raw = pipeline.read_input(input)?;
                let json = convert::to_json(kind, &raw)?;
                pipeline.encrypt_bytes(&json, &output)?
            } else {
                pipeline.encrypt_file(input, &output)?
            };
            Ok(report("encrypt", &output, Some(kind), bytes_written))
        }
        Command::Decrypt { input, output } => {
            if classify(input)? != Some(ContentKind::Envelope) {
                return Err(SealError::Unsupported(format!(
                    "only envelope documents can be decrypted: {}",
                    input.display()
                )));
            }
            let output = resolve_output(cfg, output)?;
            let key = store.load()?;
            let bytes_written = build_pipeline(cli, cfg, &key).decrypt_file(input, &output)?;
            Ok(report("decrypt", &output, Some(ContentKind::Envelope), bytes_written))
        }
        Command::Keygen { force } => {
            let key = SymmetricKey::generate();
            store.save(&key, *force)?;
            info!(path = %store.path().display(), key_id = %key.fingerprint(), force, "key generated");
            Ok(report("keygen", store.path(), None, KEY_LEN as u64))
        }
    }
}

/// Print a success line to stdout.
pub fn print_success(report: &OperationReport, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(report) {
            println!("{line}");
            return;
        }
    }
    println!("{}", describe(report));
}

/// Print a failure line to stderr.
pub fn print_failure(err: &SealError, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(&ErrorReport::from(err)) {
            eprintln!("{line}");
            return;
        }
    }
    eprintln!("[ERROR] {}: {err}", err.code());
}

fn describe(report: &OperationReport) -> String {
    let what = match (report.mode.as_str(), report.content_kind.as_deref()) {
        ("encrypt", Some("pdf")) => "PDF encrypted successfully.".to_owned(),
        ("encrypt", Some(kind)) => {
            format!("{} file converted to JSON and encrypted.", kind.to_uppercase())
        }
        ("decrypt", _) => "File decrypted successfully.".to_owned(),
        ("keygen", _) => "Key generated.".to_owned(),
        (mode, _) => format!("{mode} completed."),
    };
    format!("[SUCCESS] {what} Output saved to {}", report.output)
}

fn classify(input: &Path) -> Result<Option<ContentKind>, SealError> {
    ClassifierChain::default()
        .classify_file(input)
        .map_err(|e| SealError::io(format!("failed to read {}", input.display()), e))
}

fn build_pipeline<'k>(cli: &Cli, cfg: &Config, key: &'k SymmetricKey) -> Pipeline<'k> {
    let pipeline = Pipeline::new(key).with_max_input_bytes(cfg.max_input_bytes);
    match &cli.context {
        Some(context) => pipeline.with_context(context.as_bytes()),
        None => pipeline,
    }
}

/// Apply `output_dir`: keep only the basename of `requested` and place it there.
fn resolve_output(cfg: &Config, requested: &Path) -> Result<PathBuf, SealError> {
    let Some(dir) = &cfg.output_dir else {
        return Ok(requested.to_path_buf());
    };
    let name = requested.file_name().ok_or_else(|| {
        SealError::Unsupported(format!("output path has no file name: {}", requested.display()))
    })?;
    fs::create_dir_all(dir)
        .map_err(|e| SealError::io(format!("failed to create output directory {dir}"), e))?;
    Ok(Path::new(dir).join(name))
}

fn report(mode: &str, output: &Path, kind: Option<ContentKind>, bytes_written: u64) -> OperationReport {
    OperationReport {
        mode: mode.to_owned(),
        output: output.display().to_string(),
        content_kind: kind.map(|k| k.as_str().to_owned()),
        bytes_written,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use crate::pipeline::DEFAULT_MAX_INPUT_BYTES;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        cfg: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let cfg = Config {
                key_path: dir.path().join("key").display().to_string(),
                output_dir: None,
                log_level: "warn".into(),
                log_format: LogFormat::Text,
                max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            };
            Self { dir, cfg }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn run(&self, args: &[&str]) -> Result<OperationReport, SealError> {
            let argv = std::iter::once("sealer").chain(args.iter().copied());
            let cli = Cli::try_parse_from(argv).unwrap();
            run(&cli, &self.cfg)
        }

        fn p(&self, name: &str) -> String {
            self.path(name).display().to_string()
        }
    }

    #[test]
    fn csv_is_converted_then_sealed() {
        let fx = Fixture::new();
        fs::write(fx.path("labs.csv"), "test,result\nHb,13.5\n").unwrap();

        let sealed = fx.run(&["encrypt", &fx.p("labs.csv"), &fx.p("labs.json")]).unwrap();
        assert_eq!(sealed.content_kind.as_deref(), Some("csv"));
        assert!(fx.path("key").exists());

        fx.run(&["decrypt", &fx.p("labs.json"), &fx.p("labs.out.json")]).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(fx.path("labs.out.json")).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([{"test": "Hb", "result": "13.5"}]));
    }

    #[test]
    fn pdf_is_sealed_verbatim() {
        let fx = Fixture::new();
        let body = b"%PDF-1.4\n\x00\xffbinary".to_vec();
        fs::write(fx.path("scan.pdf"), &body).unwrap();

        let sealed = fx.run(&["encrypt", &fx.p("scan.pdf"), &fx.p("scan.json")]).unwrap();
        assert!(describe(&sealed).starts_with("[SUCCESS] PDF encrypted successfully."));

        let opened = fx.run(&["decrypt", &fx.p("scan.json"), &fx.p("scan.out.pdf")]).unwrap();
        assert_eq!(opened.bytes_written, body.len() as u64);
        assert_eq!(fs::read(fx.path("scan.out.pdf")).unwrap(), body);
    }

    #[test]
    fn unsupported_input_is_rejected_before_key_creation() {
        let fx = Fixture::new();
        fs::write(fx.path("photo.png"), b"\x89PNG\r\n").unwrap();
        let err = fx.run(&["encrypt", &fx.p("photo.png"), &fx.p("x.json")]).unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)));
        assert!(!fx.path("key").exists());
    }

    #[test]
    fn decrypt_accepts_only_envelopes() {
        let fx = Fixture::new();
        fs::write(fx.path("notes.txt"), "a: b\n").unwrap();
        let err = fx.run(&["decrypt", &fx.p("notes.txt"), &fx.p("out")]).unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)));
        assert!(!fx.path("out").exists());
    }

    #[test]
    fn decrypt_without_key_is_key_load_error() {
        let fx = Fixture::new();
        fs::write(
            fx.path("sealed.json"),
            r#"{"nonce": "AAAAAAAAAAAAAAAA", "ciphertext": "", "tag": "AAAAAAAAAAAAAAAAAAAAAA=="}"#,
        )
        .unwrap();
        let err = fx.run(&["decrypt", &fx.p("sealed.json"), &fx.p("out")]).unwrap_err();
        assert!(matches!(err, SealError::KeyLoad(_)));
        assert!(!fx.path("key").exists());
    }

    #[test]
    fn context_flag_is_required_to_open() {
        let fx = Fixture::new();
        fs::write(fx.path("visit.txt"), "ward: B\n").unwrap();
        fx.run(&["--context", "patient-7", "encrypt", &fx.p("visit.txt"), &fx.p("v.json")])
            .unwrap();

        let err = fx.run(&["decrypt", &fx.p("v.json"), &fx.p("v.out")]).unwrap_err();
        assert!(matches!(err, SealError::Authentication));
        fx.run(&["decrypt", "--context", "patient-7", &fx.p("v.json"), &fx.p("v.out")])
            .unwrap();
    }

    #[test]
    fn keygen_refuses_to_replace_without_force() {
        let fx = Fixture::new();
        fx.run(&["keygen"]).unwrap();
        let first = fs::read(fx.path("key")).unwrap();

        let err = fx.run(&["keygen"]).unwrap_err();
        assert!(matches!(err, SealError::KeyPersist(_)));
        assert_eq!(fs::read(fx.path("key")).unwrap(), first);

        fx.run(&["keygen", "--force"]).unwrap();
        assert_ne!(fs::read(fx.path("key")).unwrap(), first);
    }

    #[test]
    fn key_file_flag_overrides_config() {
        let fx = Fixture::new();
        let other = fx.p("other.key");
        fx.run(&["--key-file", &other, "keygen"]).unwrap();
        assert!(fx.path("other.key").exists());
        assert!(!fx.path("key").exists());
    }

    #[test]
    fn output_dir_keeps_only_basename() {
        let mut fx = Fixture::new();
        fx.cfg.output_dir = Some(fx.p("uploads"));
        let resolved = resolve_output(&fx.cfg, Path::new("/elsewhere/result.pdf")).unwrap();
        assert_eq!(resolved, fx.path("uploads").join("result.pdf"));
        assert!(fx.path("uploads").is_dir());
    }

    #[test]
    fn output_passes_through_without_output_dir() {
        let fx = Fixture::new();
        let resolved = resolve_output(&fx.cfg, Path::new("a/b.json")).unwrap();
        assert_eq!(resolved, PathBuf::from("a/b.json"));
    }

    #[test]
    fn error_line_names_the_kind() {
        let report = ErrorReport::from(&SealError::MalformedEnvelope("missing field `tag`".into()));
        assert_eq!(report.code, "malformed_envelope");
    }
}
