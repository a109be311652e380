use clap::Parser;
use std::io::{self, BufRead, Write};
use std::time::Instant;
use type_quiz::quiz_interface::{
    CreateSessionRequest, QuestionView, SessionRequest, SubmitAnswerRequest,
};
use type_quiz::{telemetry, QuizConfig, QuizService};

/// Terminal type-matchup quiz
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// easy, normal or hard (defaults to the configured difficulty)
    #[arg(long, short)]
    difficulty: Option<String>,
    /// Number of questions (1-100)
    #[arg(long, short)]
    count: Option<usize>,
    /// Seed for a reproducible quiz
    #[arg(long)]
    seed: Option<u64>,
    /// Only draw from these types (comma separated)
    #[arg(long, value_delimiter = ',')]
    focus: Vec<String>,
    /// Never draw these types (comma separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
    /// Minimum number of distinct effectiveness levels in the quiz
    #[arg(long)]
    min_variety: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();
    let cli = Cli::parse();
    let config = QuizConfig::load()?;

    let mut request = CreateSessionRequest::new(
        cli.difficulty
            .unwrap_or_else(|| config.default_difficulty.to_string()),
        cli.count.unwrap_or(config.default_question_count),
    );
    request.seed = cli.seed;
    request.focus_types = (!cli.focus.is_empty()).then_some(cli.focus);
    request.exclude_types = (!cli.exclude.is_empty()).then_some(cli.exclude);
    request.min_effectiveness_variety = cli.min_variety;

    let service = QuizService::new(config);
    let created = service.create_session(request)?;
    let session_id = created.session_id;

    println!(
        "{} questions on {} difficulty (about {}s). Answer with a number or a level name, 'q' to stop.",
        created.config.question_count,
        created.config.difficulty,
        created.estimated_time_ms / 1000
    );

    let started = service.start_game(SessionRequest::new(&session_id))?;
    let mut current = started.current_question;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(question) = current.take() {
        print_question(&question);
        let asked_at = Instant::now();

        let Some(line) = lines.next() else {
            break;
        };
        let input = line?;
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }

        let answer = match input.parse::<usize>() {
            Ok(n) if (1..=question.choices.len()).contains(&n) => question.choices[n - 1].name().to_string(),
            _ => input.to_string(),
        };

        match service.submit_answer(SubmitAnswerRequest {
            session_id: session_id.clone(),
            answer,
            time_spent_ms: Some(asked_at.elapsed().as_millis() as u64),
        }) {
            Ok(response) => {
                let verdict = if response.is_correct { "Correct!" } else { "Wrong." };
                println!("{} {}\n", verdict, response.explanation);
                current = response.next_question;
            }
            Err(e) => {
                println!("{}\n", e);
                current = Some(question);
            }
        }
    }

    let results = service.end_game(SessionRequest::new(&session_id))?.results;
    println!("{}", results);
    Ok(())
}

fn print_question(question: &QuestionView) {
    println!("Question {}: {}", question.number, question.prompt);
    for (i, level) in question.choices.iter().enumerate() {
        println!("  {}. {}", i + 1, level);
    }
    print!("> ");
    let _ = io::stdout().flush();
}
