use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flow_engine::{
    apply_auto_fixes_with, calculate_auto_layout, create_empty_flow, has_errors,
    validate_flow_with, AutomationFlow, FlowLimits, IdGenerator, Result,
};

/// Inspect and repair chat automation flow files
#[derive(Parser, Debug)]
#[command(name = "flowctl", version, about, long_about = None)]
struct Cli {
    /// JSON file overriding the validation limits
    #[arg(long, global = true)]
    limits: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report validation issues; exits with status 1 when any is an error
    Validate {
        /// Path to the flow JSON file
        file: PathBuf,
        /// Print the issues as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recompute node positions from the graph structure
    Layout {
        file: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply the automatic fixes for fixable issues
    Fix {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a new flow holding only a trigger
    New {
        #[arg(long)]
        account: i64,
        #[arg(long)]
        workspace: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let limits = match &cli.limits {
        Some(path) => FlowLimits::from_file(path)?,
        None => FlowLimits::default(),
    };

    match cli.command {
        Command::Validate { file, json } => {
            let flow = read_flow(&file)?;
            let issues = validate_flow_with(&flow, &limits);
            if json {
                println!("{}", serde_json::to_string_pretty(&issues)?);
            } else if issues.is_empty() {
                println!("'{}' has no issues", flow.name);
            } else {
                for issue in &issues {
                    println!("{}", issue);
                }
            }
            if has_errors(&issues) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Layout { file, output } => {
            let flow = read_flow(&file)?;
            write_flow(&calculate_auto_layout(&flow), output.as_deref())?;
        }
        Command::Fix { file, output } => {
            let flow = read_flow(&file)?;
            let fixed = apply_auto_fixes_with(&flow, &limits);
            let remaining = validate_flow_with(&fixed, &limits);
            log::info!(
                "{} issue(s) remain after fixing '{}'",
                remaining.len(),
                fixed.name
            );
            write_flow(&fixed, output.as_deref())?;
        }
        Command::New {
            account,
            workspace,
            name,
            output,
        } => {
            let mut ids = IdGenerator::new();
            let mut flow = create_empty_flow(&mut ids, account, workspace);
            if let Some(name) = name {
                flow.name = name;
            }
            write_flow(&flow, output.as_deref())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_flow(path: &Path) -> Result<AutomationFlow> {
    let content = fs::read_to_string(path)?;
    let flow: AutomationFlow = serde_json::from_str(&content)?;
    log::debug!("Read flow '{}' from {:?}", flow.name, path);
    Ok(flow)
}

fn write_flow(flow: &AutomationFlow, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(flow)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            log::info!("Wrote flow '{}' to {:?}", flow.name, path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use flow_engine::{FlowBuilder, NodeData, TriggerType};
    use tempfile::TempDir;

    fn support_flow() -> FlowBuilder {
        FlowBuilder::new("Support", 1, "ws")
            .trigger("t", TriggerType::AnyReply)
            .message("m", "How can we help?")
            .button("m-a", "Sales")
            .end("e")
            .connect_trigger("t", "m")
            .connect("m", "m-a", "e")
    }

    fn write_input(dir: &TempDir, flow: &AutomationFlow) -> PathBuf {
        let path = dir.path().join("flow.json");
        fs::write(&path, serde_json::to_string(flow).unwrap()).unwrap();
        path
    }

    fn run_args(args: &[&str]) -> Result<ExitCode> {
        run(Cli::try_parse_from(args.iter().copied()).unwrap())
    }

    fn path_arg(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["flowctl", "validate", "flow.json", "--json"]).unwrap();
        match cli.command {
            Command::Validate { file, json } => {
                assert_eq!(file, PathBuf::from("flow.json"));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_new_requires_ids() {
        assert!(Cli::try_parse_from(["flowctl", "new", "--account", "7"]).is_err());
        let cli = Cli::try_parse_from([
            "flowctl",
            "--limits",
            "limits.json",
            "new",
            "--account",
            "7",
            "--workspace",
            "ws",
        ])
        .unwrap();
        assert_eq!(cli.limits, Some(PathBuf::from("limits.json")));
    }

    #[test]
    fn test_validate_exit_codes() {
        let dir = TempDir::new().unwrap();

        let valid = write_input(&dir, &support_flow().build());
        let code = run_args(&["flowctl", "validate", path_arg(&valid)]).unwrap();
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::SUCCESS));

        let invalid = write_input(&dir, &support_flow().message("blank", "").build());
        let code = run_args(&["flowctl", "validate", "--json", path_arg(&invalid)]).unwrap();
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::FAILURE));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(run_args(&["flowctl", "validate", path_arg(&missing)]).is_err());
        let with_missing_limits = [
            "flowctl",
            "--limits",
            path_arg(&missing),
            "new",
            "--account",
            "1",
            "--workspace",
            "ws",
        ];
        assert!(run_args(&with_missing_limits).is_err());
    }

    #[test]
    fn test_fix_writes_truncated_header() {
        let dir = TempDir::new().unwrap();
        let flow = FlowBuilder::new("Support", 1, "ws")
            .trigger("t", TriggerType::AnyReply)
            .message("m", "How can we help?")
            .with_header("h".repeat(75))
            .button("m-a", "Sales")
            .end("e")
            .connect_trigger("t", "m")
            .connect("m", "m-a", "e")
            .build();
        let input = write_input(&dir, &flow);
        let output = dir.path().join("fixed.json");

        run_args(&["flowctl", "fix", path_arg(&input), "-o", path_arg(&output)]).unwrap();

        let fixed = read_flow(&output).unwrap();
        let header = fixed
            .nodes
            .iter()
            .find_map(|node| match &node.data {
                NodeData::Message(data) => data.header.clone(),
                _ => None,
            })
            .unwrap();
        assert_eq!(header, "h".repeat(60));
        assert_eq!(fixed.edges.len(), flow.edges.len());
    }

    #[test]
    fn test_new_and_layout_write_files() {
        let dir = TempDir::new().unwrap();
        let created = dir.path().join("new.json");
        run_args(&[
            "flowctl",
            "new",
            "--account",
            "7",
            "--workspace",
            "ws-7",
            "--name",
            "Welcome",
            "-o",
            path_arg(&created),
        ])
        .unwrap();
        let flow = read_flow(&created).unwrap();
        assert_eq!(flow.name, "Welcome");
        assert_eq!(flow.account_id, 7);
        assert_eq!(flow.nodes.len(), 1);

        let laid_out = dir.path().join("layout.json");
        let input = write_input(&dir, &support_flow().build());
        run_args(&["flowctl", "layout", path_arg(&input), "-o", path_arg(&laid_out)]).unwrap();
        let flow = read_flow(&laid_out).unwrap();
        let trigger_y = flow.find_node("t").unwrap().position.y;
        assert!(flow.find_node("m").unwrap().position.y > trigger_y);
    }
}
