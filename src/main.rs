use clap::Parser;
use miette::Result;
use seedcat::cli::{init_logging, Cli, Commands};

fn main() -> Result<()> {
    // Terminate quietly on a closed pipe (`seedcat export color | head`)
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
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => seedcat::cli::commands::init::run(args),
        Commands::Import(args) => seedcat::cli::commands::import::run(args, &global),
        Commands::Entry(cmd) => seedcat::cli::commands::entry::run(cmd, &global),
        Commands::Export(args) => seedcat::cli::commands::export::run(args, &global),
        Commands::Search(args) => seedcat::cli::commands::search::run(args, &global),
        Commands::Reference(cmd) => seedcat::cli::commands::reference::run(cmd, &global),
        Commands::Convert(args) => seedcat::cli::commands::convert::run(args, &global),
        Commands::Fields => seedcat::cli::commands::fields::run(&global),
        Commands::Completions(args) => seedcat::cli::commands::completions::run(args),
    }
}
