use std::io::Write;

use canyon::{
    agent::{Agent, AgentEvent},
    conversation::Session,
    error::{CanyonError, Result},
    llm::{
        ChatModel,
        prompts::{GREETING, SAMPLE_QUERIES},
    },
};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run<M: ChatModel>(agent: &Agent<M>) -> Result<()> {
    let mut session = Session::with_greeting(GREETING);
    println!("{GREETING}");
    print_samples();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout()
            .flush()
            .map_err(|e| CanyonError::io("flushing stdout", e))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CanyonError::io("reading stdin", e))?
        else {
            break;
        };

        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                print_samples();
                continue;
            }
            "/clear" => {
                session.clear();
                println!("History cleared.");
                continue;
            }
            _ => {}
        }

        match agent.respond_with(&mut session, input, print_event).await {
            Ok(reply) => println!("\n{}", reply.answer),
            Err(err) => {
                tracing::warn!(error = %err, "turn_failed");
                println!("error: {err}");
            }
        }
    }

    Ok(())
}

pub fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::ToolCall { name, arguments } => println!("tool ▸ {name}({arguments})"),
        AgentEvent::ToolResult { name, ok: false, preview } => {
            println!("tool ▸ {name} failed: {preview}")
        }
        _ => {}
    }
}

fn print_samples() {
    println!("\nTry asking:");
    for sample in SAMPLE_QUERIES {
        println!("  - {sample}");
    }
    println!("Commands: /clear, /help, /quit");
}
