use std::fs;
use std::io::{self, Write};

use colored::Colorize;

use crate::{
    cli::{BoardCommand, BoardFormat, DataDirArgs, StatusArgs},
    error::{ServiceError, ServiceResult},
    metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION},
    runtime::RuntimeInfo,
    storage::Store,
    types::{Board, ColumnId},
};

pub async fn init(args: DataDirArgs) -> ServiceResult<()> {
    let dir = args.resolve();
    let store = Store::open(&dir).await?;
    println!(
        "{} data directory ready at {}",
        "✓".green(),
        store.data_dir().display()
    );
    Ok(())
}

pub fn render_board(board: &Board, format: BoardFormat) -> ServiceResult<String> {
    match format {
        BoardFormat::Json => Ok(serde_json::to_string_pretty(board)?),
        BoardFormat::Csv => Ok(board.to_csv()),
    }
}

pub fn parse_board(raw: &str, format: BoardFormat) -> ServiceResult<Board> {
    match format {
        BoardFormat::Json => Board::from_json(raw),
        BoardFormat::Csv => Board::from_csv(raw),
    }
}

pub async fn board(command: BoardCommand) -> ServiceResult<()> {
    match command {
        BoardCommand::Export {
            data,
            format,
            output,
        } => {
            let store = Store::open(data.resolve()).await?;
            let rendered = render_board(&store.board().await?, format)?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered)?;
                    eprintln!("{} board written to {}", "✓".green(), path.display());
                }
                None => {
                    let mut stdout = io::stdout().lock();
                    writeln!(stdout, "{rendered}")?;
                }
            }
        }
        BoardCommand::Import { data, file, format } => {
            let raw = fs::read_to_string(&file)?;
            let format = format.unwrap_or_else(|| BoardFormat::from_path(&file));
            let board = parse_board(&raw, format)?;
            let store = Store::open(data.resolve()).await?;
            let board = store.replace_board(board).await?;
            let total: usize = ColumnId::ALL.iter().map(|c| board.tasks(*c).len()).sum();
            println!(
                "{} imported {total} tasks from {}",
                "✓".green(),
                file.display()
            );
        }
        BoardCommand::Reset { data } => {
            let store = Store::open(data.resolve()).await?;
            store.reset_board().await?;
            println!("{} board reset to the default CCNA topics", "✓".green());
        }
    }
    Ok(())
}

pub fn status(args: StatusArgs) -> ServiceResult<()> {
    let info = match RuntimeInfo::read(&args.runtime_info_file) {
        Ok(info) => info,
        Err(ServiceError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {
            println!("{} no running server found", "✗".red());
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    print!("{}", describe_runtime(&info));
    Ok(())
}

/// Summary of a runtime file. A killed server leaves its file behind, so this
/// reports the last start only.
pub fn describe_runtime(info: &RuntimeInfo) -> String {
    format!(
        "{} {}\n  {:<12} {}\n  {:<12} http://{}\n  {:<12} {}\n  {:<12} {}\n  {}\n",
        "●".yellow(),
        "server last started".bold(),
        "pid".dimmed(),
        info.pid,
        "address".dimmed(),
        info.addr,
        "data".dimmed(),
        info.data_dir.display(),
        "started at".dimmed(),
        info.started_at.to_rfc3339(),
        "(left behind if the process was killed; check the pid)".dimmed(),
    )
}

pub fn version() {
    println!("{} {}", PKG_NAME.bold(), PKG_VERSION);
    if !PKG_DESCRIPTION.is_empty() {
        println!("{PKG_DESCRIPTION}");
    }
}
