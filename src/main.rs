use anyhow::Context;
use sish::io_adapters::{BufReadSource, RustylineSource};
use sish::{Interpreter, ShellConfig};
use std::io::{self, IsTerminal};

fn main() {
    env_logger::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("sish: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<i32> {
    let config = ShellConfig::from_env();
    log::debug!("starting with {config:?}");
    let mut shell = Interpreter::with_config(config).context("failed to start shell")?;

    let code = if io::stdin().is_terminal() {
        let mut source = RustylineSource::new().context("failed to set up line editor")?;
        shell.repl(&mut source)?
    } else {
        let mut source = BufReadSource::new(io::stdin().lock(), io::stdout());
        shell.repl(&mut source)?
    };
    Ok(code)
}
