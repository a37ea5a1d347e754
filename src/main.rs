use clap::{Parser, ValueEnum};
use miette::Result;
use qbom::cli::{Cli, Commands, OutputFormat};
use qbom::core::logging::{self, LogOptions};
use qbom::core::{Config, Project};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior so piping to `head` exits quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let mut global = cli.global;

    let project = match &global.project {
        Some(path) => Project::discover_from(path).ok(),
        None => Project::discover().ok(),
    };
    let config = Config::load_for(project.as_ref());
    logging::init(&LogOptions::from_config(&config, global.verbose, global.quiet));

    if global.format == OutputFormat::Auto {
        if let Some(format) = config
            .default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
        {
            global.format = format;
        }
    }

    match cli.command {
        Commands::Init(args) => qbom::cli::commands::init::run(args),
        Commands::Mat(cmd) => qbom::cli::commands::mat::run(cmd, &global),
        Commands::Asm(cmd) => qbom::cli::commands::asm::run(cmd, &global),
        Commands::Cat(cmd) => qbom::cli::commands::cat::run(cmd, &global),
        Commands::Grp(cmd) => qbom::cli::commands::grp::run(cmd, &global),
        Commands::Tmpl(cmd) => qbom::cli::commands::tmpl::run(cmd, &global),
        Commands::Job(cmd) => qbom::cli::commands::job::run(cmd, &global),
        Commands::Select(cmd) => qbom::cli::commands::select::run(cmd, &global),
        Commands::Report(cmd) => qbom::cli::commands::report::run(cmd, &global),
        Commands::Backup(cmd) => qbom::cli::commands::backup::run(cmd, &global),
        Commands::Serve(args) => qbom::cli::commands::serve::run(args, &global),
        Commands::Completions(args) => qbom::cli::commands::completions::run(args),
    }
}
