use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use lcrawl_crawler::{Crawler, CrawlerConfig, HttpFetcher, Record};
use lcrawl_extract::{Page, Rules};
use tokio::runtime;
use url::Url;

mod sink;

/// Crawl a paginated learning site into JSON, CSV and a page archive
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[command(name = "crawl")]
    Crawl(CrawlArgs),
    #[command(name = "scrap")]
    Scrap(ScrapArgs),
    #[command(hide = true)]
    Completion,
}

/// Crawl from the start page, then archive every item page found
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Optional crawler yaml configuration file
    #[arg(env = "LCRAWL_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Override the start URL
    #[arg(long)]
    pub start_url: Option<String>,
    /// Override the origin used to resolve root-relative links
    #[arg(long)]
    pub origin: Option<String>,
    /// Override the path prefix of listing pages
    #[arg(long)]
    pub section_path: Option<String>,
    /// Override the directory receiving tasks.json, tasks.csv and html/
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,
    /// Override the maximum number of concurrent page downloads
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Override the minimum delay between two request starts
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Override crawler's user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override the per-request timeout
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// When quiet only warnings and errors are logged
    #[arg(long, short)]
    pub quiet: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<CrawlerConfig> {
    match path {
        Some(path) => Ok(serde_yaml::from_reader(File::open(path)?)?),
        None => Ok(CrawlerConfig::default()),
    }
}

impl TryFrom<&CrawlArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = load_config(args.crawler_config.as_ref())?;
        if let Some(start_url) = &args.start_url {
            conf.start_url = start_url.to_string();
        }
        if let Some(origin) = &args.origin {
            conf.origin = Some(origin.to_string());
        }
        if let Some(section_path) = &args.section_path {
            conf.section_path = Some(section_path.to_string());
        }
        if let Some(output_dir) = &args.output_dir {
            conf.output_dir = output_dir.clone();
        }
        if let Some(concurrency) = args.concurrency {
            conf.concurrency = concurrency;
        }
        if let Some(interval_ms) = args.interval_ms {
            conf.interval_ms = interval_ms;
        }
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(timeout_secs) = args.timeout_secs {
            conf.timeout_secs = timeout_secs;
        }
        Ok(conf)
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let conf = CrawlerConfig::try_from(&args)?;
    let output_dir = conf.output_dir.clone();
    fs::create_dir_all(&output_dir)?;

    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    let report = rt.block_on(async {
        let fetcher = HttpFetcher::new(&conf)?;
        Crawler::new(conf, fetcher)?.run().await
    })?;

    if report.conflicts > 0 {
        log::warn!(
            "{} duplicate records disagreed on category or grade, kept the last one found",
            report.conflicts
        );
    }

    let json_path = output_dir.join("tasks.json");
    let csv_path = output_dir.join("tasks.csv");
    sink::write_json(&json_path, &report.records)?;
    sink::write_csv(&csv_path, &report.records)?;

    log::info!(
        "Saved {} tasks ({} archived, {} without page) to {} and {}",
        report.records.len(),
        report.archived,
        report.archive_failed,
        json_path.display(),
        csv_path.display()
    );
    Ok(())
}

/// Extract the records of a single page and print them to stdout
#[derive(Debug, clap::Args)]
#[command(group = clap::ArgGroup::new("page").required(true))]
pub struct ScrapArgs {
    /// Optional crawler yaml configuration file, for extraction rules and site
    #[arg(env = "LCRAWL_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// A local html page to scrap
    #[arg(group = "page", long, requires = "base_url")]
    pub file: Option<PathBuf>,
    /// URL the local page was downloaded from, to resolve its links
    #[arg(long)]
    pub base_url: Option<String>,
    /// A distant html page to scrap
    #[arg(group = "page", long)]
    pub url: Option<String>,
}

pub fn scrap(args: ScrapArgs) -> anyhow::Result<()> {
    let conf = load_config(args.crawler_config.as_ref())?;

    let records: Vec<Record> = if let Some(url) = args.url {
        let url = Url::parse(&url)?;
        let rt = runtime::Builder::new_current_thread().enable_all().build()?;
        rt.block_on(async {
            let fetcher = HttpFetcher::new(&conf)?;
            Crawler::new(conf, fetcher)?.scrap(&url).await
        })?
    } else if let (Some(path), Some(base_url)) = (args.file, args.base_url) {
        let site = conf.site()?;
        let rules = Rules::compile(&conf.rules)?;
        let page = Page::parse(&fs::read_to_string(&path)?, Url::parse(&base_url)?);
        let context = page.context(&rules);
        page.records(&rules, &site, &context)
    } else {
        anyhow::bail!("Missing `url` or `file`");
    };

    serde_json::to_writer_pretty(io::stdout(), &records)?;
    println!();
    Ok(())
}

const DEFAULT_FILTER: &str = "lcrawl=info,lcrawl_crawler=info";
const QUIET_FILTER: &str = "lcrawl=warn,lcrawl_crawler=warn";

fn init_logger(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if args.quiet {
                init_logger(QUIET_FILTER);
            } else {
                init_logger(DEFAULT_FILTER);
            }
            crawl(args)
        }
        SubCommand::Scrap(args) => {
            init_logger(QUIET_FILTER);
            scrap(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "lcrawl", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "lcrawl",
            "crawl",
            "--output-dir",
            "out",
            "--concurrency",
            "5",
            "--interval-ms",
            "0",
        ]);
        let SubCommand::Crawl(args) = args.cmd else {
            panic!("expected crawl");
        };
        let conf = CrawlerConfig::try_from(&args).unwrap();
        assert_eq!(conf.output_dir, PathBuf::from("out"));
        assert_eq!(conf.concurrency, 5);
        assert_eq!(conf.interval_ms, 0);
        assert_eq!(conf.start_url, "https://learning.ua/matematyka/");
    }

    #[test]
    fn quiet_keeps_task_failures() {
        let args = Args::parse_from(["lcrawl", "crawl", "-q"]);
        let SubCommand::Crawl(args) = args.cmd else {
            panic!("expected crawl");
        };
        assert!(args.quiet);
        assert!(QUIET_FILTER
            .split(',')
            .all(|directive| directive.ends_with("=warn")));
        assert!(QUIET_FILTER.contains("lcrawl_crawler="));
    }

    #[test]
    fn yaml_config_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawler.yaml");
        fs::write(
            &path,
            "startUrl: https://learning.ua/fizyka/\nintervalMs: 250\nrules:\n  gradePattern: grade\n",
        )
        .unwrap();

        let conf = load_config(Some(&path)).unwrap();
        assert_eq!(conf.start_url, "https://learning.ua/fizyka/");
        assert_eq!(conf.interval_ms, 250);
        assert_eq!(conf.concurrency, 3);
        assert_eq!(conf.rules.grade_pattern, "grade");
        assert_eq!(conf.rules.heading_selector, "h1, .page-title, .title");
    }
}
