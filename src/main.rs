use std::ffi::OsString;
use std::process::ExitCode;
use std::time::Instant;

use html::{DomView, NodeId};
use texclip::ready::wait_for_ready;
use texclip::shell::{SystemClipboard, TerminalSurface};
use texclip::{extract_with_strategy, Config, Controller, Error, Page};
use tracing::{error, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: texclip [options] <page>

  <page>                  saved HTML file (path or file:// URL)

options:
  --copy <n>              copy the LaTeX of formula <n>
  --hover <n>             show the copy button for formula <n>
  --no-dblclick           copy through the button instead of a double-click
  --selector <css>        formula signature, may be repeated (replaces the defaults)
  --init-delay <ms>       settle time before scanning
  --startup-timeout <ms>  longest wait for the renderer
  --debounce <ms>         rescan debounce
  --hide-delay <ms>       grace period before the button hides
  --notification <ms>     how long notifications stay up
  -t, --trace             log to stderr";

#[derive(Debug, thiserror::Error)]
enum ArgsError {
    #[error(transparent)]
    Parse(#[from] pico_args::Error),
    #[error("unexpected arguments: {0:?}")]
    Unused(Vec<OsString>),
}

struct Args {
    pub input: String,
    pub copy: Option<usize>,
    pub hover: Option<usize>,
    pub trace: bool,
    pub config: Config,
}

fn main() -> ExitCode {
    let args = match parse_args(pico_args::Arguments::from_env()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };
    if args.trace {
        tracing_subscriber::fmt::fmt()
            .with_span_events(FmtSpan::ACTIVE)
            .with_max_level(Level::DEBUG)
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish()
            .init();
        info!("Logger initialized");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(%e, "Giving up");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_args(mut pargs: pico_args::Arguments) -> Result<Args, ArgsError> {
    let trace = pargs.contains(["-t", "--trace"]);
    let copy = pargs.opt_value_from_str("--copy")?;
    let hover = pargs.opt_value_from_str("--hover")?;
    let config = Config::from_args(&mut pargs)?;
    let args = Args {
        input: pargs.free_from_str()?,
        copy,
        hover,
        trace,
        config,
    };
    let unused = pargs.finish();
    if !unused.is_empty() {
        return Err(ArgsError::Unused(unused));
    }
    Ok(args)
}

fn run(args: Args) -> texclip::Result<()> {
    let page = Page::open(&args.input)?;
    wait_for_ready(None, &args.config);

    let mut controller = Controller::new(
        args.config,
        TerminalSurface::stderr(),
        SystemClipboard::stdout(),
    )?;
    controller.scan(&page.dom);
    let formulas = controller.attached().to_vec();

    let pick = |index: usize| {
        formulas.get(index).copied().ok_or(Error::NoSuchFormula {
            index,
            count: formulas.len(),
        })
    };

    if let Some(index) = args.hover {
        let formula = pick(index)?;
        if !controller.hover_enter(&page.dom, formula) {
            eprintln!("formula #{} has no recoverable LaTeX source", index);
        }
    }

    if let Some(index) = args.copy {
        let formula = pick(index)?;
        let now = Instant::now();
        let copied = controller.double_click(&page.dom, formula, now)?
            || (controller.hover_enter(&page.dom, formula) && controller.button_click(now)?);
        if !copied {
            eprintln!("formula #{} has no recoverable LaTeX source", index);
            return Ok(());
        }
        // A truncated preview gets clicked, so the whole source is on screen
        let truncated = controller
            .notifications()
            .last()
            .filter(|n| n.preview != n.full_text)
            .map(|n| n.id);
        if let Some(id) = truncated {
            controller.notification_click(id);
        }
        return Ok(());
    }

    if args.hover.is_none() {
        list(&page, &formulas);
    }
    Ok(())
}

/// Print every formula with its recovered source, one per line
fn list(page: &Page, formulas: &[NodeId]) {
    info!(url = %page.url(), count = formulas.len(), "Listing formulas");
    for (index, &formula) in formulas.iter().enumerate() {
        let tag = page.dom.tag_name(formula).unwrap_or("?");
        match extract_with_strategy(&page.dom, formula) {
            Some(found) => println!("{}\t{}\t{:?}\t{}", index, tag, found.strategy, found.latex),
            None => println!("{}\t{}\t-\t", index, tag),
        }
    }
}
