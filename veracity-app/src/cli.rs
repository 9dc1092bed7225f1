use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use veracity_llm::Message;

/// Check a forwarded message, news snippet or offer for misinformation and scam patterns.
#[derive(Debug, Parser)]
#[command(name = "veracity", version)]
pub struct Args {
    /// Message to analyze. Read from stdin when omitted.
    #[arg(conflicts_with_all = ["file", "example"])]
    pub message: Option<String>,

    /// Read the message from a file.
    #[arg(short, long, value_name = "PATH", conflicts_with = "example")]
    pub file: Option<PathBuf>,

    /// Analyze one of the built-in sample messages.
    #[arg(short, long, value_enum)]
    pub example: Option<Sample>,

    /// Configuration file (default: user config dir, then ./veracity.yaml).
    #[arg(short, long, value_name = "PATH", env = "VERACITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the analysis as JSON instead of the formatted report.
    #[arg(long)]
    pub json: bool,

    /// Disable coloured output.
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Sample {
    /// Chain-letter style forward
    Whatsapp,
    /// Too-good-to-be-true job offer
    Job,
    /// Health claim dressed up as news
    News,
}

impl Sample {
    pub fn label(self) -> &'static str {
        match self {
            Sample::Whatsapp => "WhatsApp forward",
            Sample::Job => "Job offer message",
            Sample::News => "Breaking news claim",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Sample::Whatsapp => {
                "Forwarded many times: NASA just confirmed a massive solar flare will hit Earth tomorrow, stay indoors! Share with everyone you love."
            }
            Sample::Job => {
                "Urgent! You have been selected for a part-time remote job at Amazon. Salary $300/day. Contact HR via WhatsApp at +1-234-567-890 to start immediately."
            }
            Sample::News => {
                "The World Health Organization has officially declared that eating ginger root cured 95% of early stage cases in the latest study."
            }
        }
    }
}

/// Pick the message text: argument, then file, then sample, then `stdin`.
///
/// The text is returned as given; trimming and the emptiness check belong
/// to `Message::new`.
pub fn resolve_input(args: &Args, stdin: &mut dyn Read) -> Result<String> {
    if let Some(message) = &args.message {
        return Ok(message.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read message from {}", path.display()));
    }
    if let Some(sample) = args.example {
        tracing::debug!(sample = sample.label(), "input.sample");
        return Ok(sample.text().to_string());
    }

    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .context("failed to read message from stdin")?;
    Ok(buf)
}

/// Resolve the input and wrap it as a [`Message`]. Blank input surfaces as
/// `VeracityError::EmptyInput` with no extra context.
pub fn read_message(args: &Args, stdin: &mut dyn Read) -> Result<Message> {
    let text = resolve_input(args, stdin)?;
    Ok(Message::new(&text)?)
}
