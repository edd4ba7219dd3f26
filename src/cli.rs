use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_RUNTIME_INFO_FILE: &str = "/tmp/ccna-tracker.runtime.json";

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArguments),
    /// Create the data directory and seed missing JSON files
    Init(DataDirArgs),
    /// Export or import the tracker board
    #[command(subcommand)]
    Board(BoardCommand),
    /// Show the runtime info of a running server
    Status(StatusArgs),
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DataDirArgs {
    /// Directory holding videos.json, comments.json and board.json
    #[arg(long, env = "TRACKER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl DataDirArgs {
    pub fn resolve(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// `<platform data dir>/ccna-tracker`, or `./data` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(PKG_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BoardFormat {
    Json,
    Csv,
}

impl BoardFormat {
    /// Guess from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => BoardFormat::Csv,
            _ => BoardFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum BoardCommand {
    /// Write the board to stdout or a file
    Export {
        #[command(flatten)]
        data: DataDirArgs,
        #[arg(long, value_enum, default_value_t = BoardFormat::Json)]
        format: BoardFormat,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace the board with the contents of a JSON or CSV export
    Import {
        #[command(flatten)]
        data: DataDirArgs,
        /// File to import
        file: PathBuf,
        /// Input format (guessed from the extension when omitted)
        #[arg(long, value_enum)]
        format: Option<BoardFormat>,
    },
    /// Restore the default CCNA topic list
    Reset {
        #[command(flatten)]
        data: DataDirArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Runtime info file written by `serve`
    #[arg(long, env = "TRACKER_RUNTIME_INFO_FILE", default_value = DEFAULT_RUNTIME_INFO_FILE)]
    pub runtime_info_file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArguments {
    /// HTTP bind address
    #[arg(long, env = "TRACKER_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Override only the port of the bind address
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    #[command(flatten)]
    pub data: DataDirArgs,

    /// Directory with the front-end files (index.html, tutorials, player)
    #[arg(long, env = "TRACKER_STATIC_DIR", default_value = ".")]
    pub static_dir: PathBuf,

    /// Runtime info file (read by the status command)
    #[arg(long, env = "TRACKER_RUNTIME_INFO_FILE", default_value = DEFAULT_RUNTIME_INFO_FILE)]
    pub runtime_info_file: PathBuf,
}

impl ServeArguments {
    pub fn default_settings() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            port: None,
            data: DataDirArgs::default(),
            static_dir: PathBuf::from("."),
            runtime_info_file: PathBuf::from(DEFAULT_RUNTIME_INFO_FILE),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        let mut addr = self
            .addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid TRACKER_ADDR '{}': {e}", self.addr))?;
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        Ok(addr)
    }

    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        self.bind_addr()?;
        if !self.static_dir.is_dir() {
            return Err(format!(
                "TRACKER_STATIC_DIR '{}' is not a directory",
                self.static_dir.display()
            ));
        }
        let data_dir = self.data.resolve();
        if data_dir.exists() && !data_dir.is_dir() {
            return Err(format!(
                "TRACKER_DATA_DIR '{}' exists and is not a directory",
                data_dir.display()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_overrides_bind_address() {
        let mut args = ServeArguments::default_settings();
        assert_eq!(args.bind_addr().unwrap().port(), 3000);
        args.port = Some(8080);
        assert_eq!(args.bind_addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn validate_rejects_bad_inputs() {
        let mut args = ServeArguments::default_settings();
        args.addr = "not-an-addr".into();
        assert!(args.validate().unwrap_err().contains("TRACKER_ADDR"));

        let mut args = ServeArguments::default_settings();
        args.static_dir = PathBuf::from("/definitely/not/here");
        assert!(args.validate().unwrap_err().contains("TRACKER_STATIC_DIR"));
    }

    #[test]
    fn serve_subcommand_parses_flags() {
        let cli = Cli::try_parse_from([
            "ccna-tracker",
            "serve",
            "--addr",
            "127.0.0.1:4000",
            "--data-dir",
            "/srv/tracker",
        ])
        .unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr, "127.0.0.1:4000");
        assert_eq!(args.data.resolve(), PathBuf::from("/srv/tracker"));
    }

    #[test]
    fn import_format_follows_extension() {
        assert_eq!(BoardFormat::from_path(Path::new("b.CSV")), BoardFormat::Csv);
        assert_eq!(BoardFormat::from_path(Path::new("b.json")), BoardFormat::Json);
        assert_eq!(BoardFormat::from_path(Path::new("b")), BoardFormat::Json);
    }
}
