use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use courseforge_core_sdk::config::DEFAULT_COMPLETION_MODEL;
use courseforge_core_sdk::prelude::*;

/**
 * \brief CLI 程序入口：构造一次 Provider，按需发起补全并打印条目。
 */
#[derive(Parser, Debug)]
#[command(name = "courseforge", version, about = "Course content completion via remote API or LM Studio")]
struct Cli {
    /** \brief 后端族标签 */
    #[arg(long, global = true, default_value = "openai")]
    provider: String,
    /** \brief 本地 LM Studio 模型名 */
    #[arg(long, global = true, default_value = DEFAULT_COMPLETION_MODEL)]
    model: String,
    #[arg(long, global = true, default_value_t = false)]
    telemetry: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 发送一条用户消息并打印归一化后的条目。
     * \param prompt 用户消息
     * \param system 可选的系统提示
     */
    Complete {
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        system: Option<String>,
    },

    /**
     * \brief 按行编号翻译文本文件中的句子。
     */
    Translate {
        #[arg(long)]
        input: std::path::PathBuf,
        #[arg(long, default_value = "Polish")]
        language: String,
    },

    /**
     * \brief 列出本地 LM Studio 可用模型。
     */
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    telemetry::init_from_env();
    if cli.telemetry {
        telemetry::set_enabled(true);
    }

    let provider = load_llm_provider(&cli.provider, &cli.model);

    match cli.command {
        Commands::Complete { prompt, system } => {
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt));

            let result = provider.get_completion(&messages, None).await;
            print_result(&result);
        }
        Commands::Translate { input, language } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("read input failed: {}", input.display()))?;
            let sentences = numbered_sentences(&text);
            if sentences.is_empty() {
                println!("Nothing to translate in {}", input.display());
                return Ok(());
            }

            telemetry::log_event(
                "cli.translate",
                &format!(
                    "input={} sentences={} language={}",
                    input.display(),
                    sentences.len(),
                    language
                ),
            );

            let messages = vec![Message::user(translation_prompt(&language, &sentences))];
            let result = provider.get_completion(&messages, None).await;
            print_result(&result);

            let missing = missing_ids(&sentences, &result);
            if !missing.is_empty() {
                println!(
                    "{} of {} sentences were not translated: {:?}",
                    missing.len(),
                    sentences.len(),
                    missing
                );
            }
        }
        Commands::Models => {
            let models = provider
                .list_local_models()
                .await
                .context("list local models failed")?;
            for model in models {
                println!("{}", model);
            }
        }
    }

    Ok(())
}

fn print_result(result: &CompletionResult) {
    for entry in result {
        println!("{}: {}", entry.entry_id, entry.translated_text);
    }
    match result.backend {
        Some(backend) => println!("({} entries from {} backend)", result.len(), backend),
        None => println!("(no completion produced)"),
    }
}

fn numbered_sentences(text: &str) -> Vec<(i64, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .zip(1..)
        .map(|(line, id)| (id, line.to_string()))
        .collect()
}

fn missing_ids(sentences: &[(i64, String)], result: &CompletionResult) -> Vec<i64> {
    sentences
        .iter()
        .map(|(id, _)| *id)
        .filter(|id| !result.iter().any(|e| e.entry_id == *id))
        .collect()
}

fn translation_prompt(language: &str, sentences: &[(i64, String)]) -> String {
    let mut prompt = format!("Translate to {}:", language);
    for (id, sentence) in sentences {
        prompt.push('\n');
        prompt.push_str(&format!("{}: {}", id, sentence));
    }
    prompt
}
