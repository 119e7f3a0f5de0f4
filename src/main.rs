//! mathpage - pre-render the math in an HTML page

use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

use mathpage::{
    CacheScope, CommandTypesetter, Converter, EngineConfig, EquationNumbers, InputFormat,
    TypesetOptions,
};

#[derive(Parser)]
#[command(name = "mathpage")]
#[command(version, about = "Replace the math in an HTML page with SVG", long_about = None)]
#[command(after_help = "EXAMPLES:
    mathpage < page.html > static.html               Inline SVG
    mathpage --img eq < page.html > static.html      Write eq0001.svg, eq0002.svg, ...
    mathpage --typesetter node -- typeset.js < in.html > out.html")]
struct Cli {
    /// Include preview markup for each formula
    #[arg(long)]
    preview: bool,

    /// Include speech text
    #[arg(long)]
    speech: bool,

    /// Ruleset to use for speech text (chromevox or mathspeak)
    #[arg(long, value_name = "RULES", default_value = "mathspeak")]
    speechrules: String,

    /// Style to use for speech text (default, brief, sbrief)
    #[arg(long, value_name = "STYLE", default_value = "default")]
    speechstyle: String,

    /// Perform automatic line-breaking
    #[arg(long)]
    linebreaks: bool,

    /// Don't use single dollar signs for delimiters
    #[arg(long)]
    nodollars: bool,

    /// Don't use a font cache for glyph paths
    #[arg(long)]
    nofontcache: bool,

    /// Repeat glyph definitions in every formula
    #[arg(long)]
    localcache: bool,

    /// Input formats to look for
    #[arg(long, value_name = "FORMATS", default_value = "AsciiMath,TeX,MathML")]
    format: String,

    /// Equation number style (none, AMS, or all)
    #[arg(long, value_name = "STYLE", default_value = "none")]
    eqno: EquationNumbers,

    /// Write each formula to <PREFIX>NNNN.svg and link it with <img>
    #[arg(long, value_name = "PREFIX", default_value = "")]
    img: String,

    /// Web font to use
    #[arg(long, default_value = "TeX")]
    font: String,

    /// ex-size in pixels
    #[arg(long, default_value_t = 6)]
    ex: u32,

    /// Width of container in ex
    #[arg(long, default_value_t = 100)]
    width: u32,

    /// Extra engine extensions (comma separated)
    #[arg(long, default_value = "")]
    extensions: String,

    /// Typesetting program, speaking JSON on stdin/stdout
    #[arg(long, value_name = "PROGRAM", default_value = "mathjax-typeset")]
    typesetter: String,

    /// Give up on the typesetter after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Arguments passed to the typesetting program
    #[arg(last = true, value_name = "ARGS")]
    typesetter_args: Vec<String>,
}

impl Cli {
    fn options(&self) -> Result<TypesetOptions, String> {
        let inputs = InputFormat::parse_list(&self.format)?;
        let scope = if self.localcache {
            CacheScope::PerEquation
        } else {
            CacheScope::Global
        };
        let mut options = TypesetOptions::default()
            .with_inputs(inputs)
            .with_equation_numbers(self.eqno)
            .with_single_dollars(!self.nodollars)
            .with_font_cache(!self.nofontcache, scope)
            .with_preview(self.preview)
            .with_size(self.ex, self.width)
            .with_linebreaks(self.linebreaks);
        options.speech = self.speech;
        options.speech_ruleset = self.speechrules.clone();
        options.speech_style = self.speechstyle.clone();
        Ok(options)
    }

    fn typesetter(&self) -> CommandTypesetter {
        let config = EngineConfig::default()
            .with_font(&self.font)
            .with_extensions(self.extensions.as_str());
        CommandTypesetter::new(&self.typesetter)
            .args(&self.typesetter_args)
            .config(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let mut converter = Converter::new(cli.typesetter())
        .with_options(cli.options()?)
        .with_image_prefix(cli.img.as_str());
    if let Some(secs) = cli.timeout {
        let timeout = Duration::try_from_secs_f64(secs).map_err(|e| format!("--timeout: {e}"))?;
        converter = converter.with_timeout(timeout);
    }

    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .map_err(|e| format!("reading stdin: {e}"))?;

    let out = converter.convert_bytes(&input).map_err(|e| e.to_string())?;
    for image in &out.images {
        tracing::info!(path = %image.path.display(), bytes = image.bytes, "wrote image");
    }

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(out.html.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| format!("writing stdout: {e}"))
}
