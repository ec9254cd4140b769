use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::blocking::Client;
use skillcoach::api::{ErrorBody, QueryRequest};
use skillcoach::conversation::{render_turn, Transcript};
use skillcoach::Answer;

#[derive(Parser, Debug)]
#[command(
    name = "skillcoach-ask",
    about = "Ask the mental-skills coach questions from the terminal"
)]
struct AskCli {
    /// Ask one question and exit (omit for an interactive session)
    #[arg(long)]
    question: Option<String>,

    /// Query endpoint of a running skillcoach-api
    #[arg(
        long,
        env = "SKILLCOACH_API_URL",
        default_value = "http://127.0.0.1:3000/api/rag-query"
    )]
    api_url: String,

    /// Seconds to wait for each answer
    #[arg(long, env = "SKILLCOACH_ASK_TIMEOUT_SECS", default_value_t = 90)]
    timeout_secs: u64,
}

fn main() -> Result<ExitCode> {
    let cli = AskCli::parse();
    let client = Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs.max(1)))
        .build()
        .context("failed to build HTTP client")?;
    let mut transcript = Transcript::new();

    if let Some(question) = cli.question.as_deref() {
        transcript.push_question(question);
        let (rendered, answered) =
            record_reply(&mut transcript, ask(&client, &cli.api_url, question));
        println!("{rendered}");
        return Ok(if answered {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    println!("Ask about mental skills (type 'exit' to quit).");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("you> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        transcript.push_question(question);
        let (rendered, _) = record_reply(&mut transcript, ask(&client, &cli.api_url, question));
        println!("{rendered}\n");
    }
    Ok(ExitCode::SUCCESS)
}

/// Adds the reply to the transcript; returns the rendered turn and whether it was an answer.
fn record_reply(transcript: &mut Transcript, reply: Result<Answer>) -> (String, bool) {
    match reply {
        Ok(answer) => (render_turn(transcript.push_answer(answer)), true),
        Err(err) => (
            render_turn(transcript.push_error(&format!("{err:#}"))),
            false,
        ),
    }
}

fn ask(client: &Client, url: &str, question: &str) -> Result<Answer> {
    let request = QueryRequest {
        question: question.to_string(),
    };
    let resp = client
        .post(url)
        .json(&request)
        .send()
        .with_context(|| format!("failed to reach {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp
            .text()
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(error) => bail!("{} ({}): {}", status, error.kind, error.error),
            Err(_) => bail!("{}: {}", status, body),
        }
    }
    resp.json().context("failed to parse answer")
}
