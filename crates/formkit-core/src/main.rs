use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use formkit_core::{logging, CheckReport, EditorConfig};
use formkit_persist::{JsonFileRepository, NodeRepository, WorkflowRepository};
use formkit_rules::Answers;
use formkit_schema::{SchemaNode, Widget};
use formkit_store::FormDocument;
use std::path::{Path, PathBuf};

fn cli() -> Command {
    Command::new("formkit")
        .version(formkit_core::VERSION)
        .about("Observation-tool form documents: templates, checks and stored forms")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory of stored forms and workflows"),
        )
        .subcommand(
            Command::new("new")
                .about("Emit the default form template")
                .arg(Arg::new("title").long("title").help("Form title"))
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write to file instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Check consistency, visibility and validation of a form")
                .arg(
                    Arg::new("form")
                        .long("form")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Form document (JSON)"),
                )
                .arg(
                    Arg::new("answers")
                        .long("answers")
                        .value_parser(value_parser!(PathBuf))
                        .help("Answers keyed by node id (JSON object)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("forms")
                .about("Stored form catalog")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List stored forms"))
                .subcommand(
                    Command::new("delete")
                        .about("Delete a form reference")
                        .arg(Arg::new("id").required(true).help("Form id")),
                ),
        )
        .subcommand(
            Command::new("workflows")
                .about("Stored workflows")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List stored workflows")),
        )
}

async fn load_config(matches: &ArgMatches) -> anyhow::Result<EditorConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EditorConfig::load(path).await?,
        None => EditorConfig::default(),
    };
    if let Some(dir) = matches.get_one::<PathBuf>("data-dir") {
        config = config.with_data_dir(dir.clone());
    }
    Ok(config)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn new_form(config: &EditorConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let overrides = args
        .get_one::<String>("title")
        .map(|title| SchemaNode::widget(Widget::Root).with_title(title.as_str()));
    let template = config.node_factory().form_template(overrides);
    let text = serde_json::to_string_pretty(&template)?;

    match args.get_one::<PathBuf>("out") {
        Some(path) => {
            tokio::fs::write(path, text)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "template written");
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn check(config: &EditorConfig, args: &ArgMatches) -> anyhow::Result<bool> {
    let Some(form) = args.get_one::<PathBuf>("form") else {
        anyhow::bail!("--form is required");
    };
    let tree: SchemaNode = read_json(form).await?;
    let answers: Answers = match args.get_one::<PathBuf>("answers") {
        Some(path) => read_json(path).await?,
        None => Answers::new(),
    };

    let mut document = FormDocument::new()
        .with_factory(config.node_factory())
        .with_options(config.document_options());
    document.replace_document(Some(tree));

    let report = CheckReport::build(&document, &config.validator(), &answers);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(report.passed())
}

async fn forms(config: &EditorConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let repo = JsonFileRepository::new(&config.data_dir);
    match args.subcommand() {
        Some(("list", _)) => {
            let forms = repo.get_form_references().await?;
            if forms.is_empty() {
                println!("No forms in {}", repo.dir().display());
            }
            for form in forms {
                println!("{}\t{}\t{}", form.id, form.name, form.updated_at.to_rfc3339());
            }
        }
        Some(("delete", sub)) => {
            let Some(id) = sub.get_one::<String>("id") else {
                anyhow::bail!("form id is required");
            };
            if repo.delete_form_reference(id).await? {
                println!("Deleted form {id}");
            } else {
                anyhow::bail!("no form with id {id}");
            }
        }
        _ => anyhow::bail!("unknown forms command"),
    }
    Ok(())
}

async fn workflows(config: &EditorConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let repo = JsonFileRepository::new(&config.data_dir);
    match args.subcommand() {
        Some(("list", _)) => {
            let workflows = repo.list_workflows().await?;
            if workflows.is_empty() {
                println!("No workflows in {}", repo.dir().display());
            }
            for workflow in workflows {
                println!("{}\t{}\tv{}", workflow.id, workflow.name, workflow.version);
            }
        }
        _ => anyhow::bail!("unknown workflows command"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches).await?;
    logging::init(&config)?;

    match matches.subcommand() {
        Some(("new", args)) => new_form(&config, args).await?,
        Some(("check", args)) => {
            if !check(&config, args).await? {
                std::process::exit(1);
            }
        }
        Some(("forms", args)) => forms(&config, args).await?,
        Some(("workflows", args)) => workflows(&config, args).await?,
        _ => anyhow::bail!("unknown command"),
    }
    Ok(())
}
