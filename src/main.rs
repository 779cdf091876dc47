use clap::Parser;
use intake::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    // This is standard practice for CLI tools that output to stdout.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler for beautiful diagnostics
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

    match cli.command {
        Commands::Run(args) => intake::cli::commands::run::run(args, &global),
        Commands::Validate(args) => intake::cli::commands::validate::run(args, &global),
        Commands::Forms(args) => intake::cli::commands::forms::run(args, &global),
        Commands::Schema(args) => intake::cli::commands::schema::run(args, &global),
        Commands::Completions(args) => intake::cli::commands::completions::run(args),
    }
}
