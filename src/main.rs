// src/main.rs

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lesson_client::{
    ApiClient, AuthState, ClientError,
    api::{ExamBackend, MaterialBackend},
    config::{Config, PASSING_SCORE_PERCENTAGE},
    handlers::{
        certificate::{self, CertificateView},
        exam::{self, ExamMachine, ExamState, SubmitOutcome},
        material_test::PracticeTest,
        progress::{CardProgress, MaterialProgressView, ProgressBoard},
        score::{ResultView, format_percentage},
    },
    models::{
        question::Question,
        user::{CreateUserRequest, LoginRequest},
    },
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line client for the lesson platform.
#[derive(Parser)]
#[command(name = "lesson-client")]
#[command(about = "Take the final exam and track material progress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the access token to export as ACCESS_TOKEN.
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a new account.
    Register {
        username: String,
        firstname: String,
        lastname: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Show the logged-in user.
    Me,

    /// Whether the final exam was already taken.
    Status,

    /// Take the final exam interactively.
    Exam {
        /// Number of questions to request
        #[arg(short, long)]
        questions: Option<u32>,
    },

    /// List past exam attempts, newest first.
    History {
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show one exam attempt with its per-question breakdown.
    Session { id: String },

    /// Download the certificate of a passed attempt.
    Certificate {
        id: String,
        /// Target directory (defaults to CERTIFICATE_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List sections.
    Sections,

    /// List the materials of a section with their progress.
    Materials { section_id: i64 },

    /// Show progress for one or more materials.
    Progress {
        #[arg(required = true)]
        material_ids: Vec<i64>,
    },

    /// Mark a material's attachment as completed.
    Complete {
        material_id: i64,
        attachment_id: String,
    },

    /// Take a material's practice test interactively.
    Practice { material_id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(&config);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {:?}", e);
            eprintln!("error: {:#}", e);
            if e
                .downcast_ref::<ClientError>()
                .is_some_and(ClientError::requires_login)
            {
                eprintln!("hint: run `lesson-client login <username>` and export ACCESS_TOKEN");
            }
            ExitCode::FAILURE
        }
    }
}

/// Console output goes to stderr so command output on stdout stays clean.
fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "lesson-client.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let console_layer = fmt::layer().with_writer(io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    let auth = AuthState::new();
    if let Some(token) = &config.access_token
        && let Err(e) = auth.set_token(token.clone())
    {
        tracing::warn!("Ignoring ACCESS_TOKEN: {}", e);
    }

    let api = ApiClient::new(config, auth)?;

    match command {
        Commands::Login { username, password } => {
            let password = password_or_prompt(password)?;
            let token = api.login(&LoginRequest { username, password }).await?;
            println!("export ACCESS_TOKEN={}", token.access_token);
        }
        Commands::Register {
            username,
            firstname,
            lastname,
            password,
        } => {
            let password = password_or_prompt(password)?;
            let user = api
                .register(&CreateUserRequest {
                    firstname,
                    lastname,
                    username,
                    password,
                })
                .await?;
            println!("Registered {} (id {})", user.username, user.id);
        }
        Commands::Me => {
            let user = api.me().await?;
            println!("{} ({}), id {}", user.full_name(), user.username, user.id);
        }
        Commands::Status => {
            let status = api.check_status().await?;
            if status.has_taken_test {
                println!(
                    "Final exam already taken (session {})",
                    status.existing_session_id.as_deref().unwrap_or("unknown")
                );
            } else {
                println!(
                    "Final exam available: {} questions drawn from {}",
                    status.test_question_count, status.total_available_tests
                );
            }
        }
        Commands::Exam { questions } => {
            run_exam(&api, questions.unwrap_or(config.exam_question_count)).await?;
        }
        Commands::History { limit } => {
            let views = exam::load_history(&api, limit.unwrap_or(config.history_limit)).await?;
            if views.is_empty() {
                println!("No attempts yet.");
            }
            for view in views {
                print_result_line(&view);
            }
        }
        Commands::Session { id } => {
            let session = api.get_session(&id).await?;
            let view = ResultView::from(&session);
            print_result(&view);
            for (i, item) in view.breakdown.iter().enumerate() {
                println!(
                    "  {:>2}. [{}] {} (yours: {}, correct: {})",
                    i + 1,
                    if item.is_correct { "x" } else { " " },
                    item.question,
                    item.user_answer.as_deref().unwrap_or("-"),
                    item.correct_answer
                );
            }
        }
        Commands::Certificate { id, dir } => match certificate::open(&api, &id).await? {
            CertificateView::NotFound => println!("No session {}.", id),
            CertificateView::Rejected { score_percentage } => println!(
                "No certificate: scored {}%, {}% needed.",
                format_percentage(score_percentage),
                format_percentage(PASSING_SCORE_PERCENTAGE)
            ),
            CertificateView::Available(session) => {
                let dir = dir.unwrap_or_else(|| config.certificate_dir.clone());
                let path = certificate::download(&api, &session, &dir).await?;
                println!("Certificate saved to {}", path.display());
            }
        },
        Commands::Sections => {
            for section in api.sections().await? {
                println!("{:>4}  {}", section.id, section.name);
            }
        }
        Commands::Materials { section_id } => {
            let materials = api.materials_by_section(section_id).await?;
            let ids: Vec<i64> = materials.iter().map(|m| m.id).collect();

            let mut board = ProgressBoard::new();
            board.fetch_all(&api, &ids).await;

            for material in &materials {
                println!(
                    "{:>4}  {:<40} {}",
                    material.id,
                    material.title,
                    progress_cell(board.get(material.id))
                );
            }
        }
        Commands::Progress { material_ids } => {
            let mut board = ProgressBoard::new();
            board.fetch_all(&api, &material_ids).await;

            for id in material_ids {
                println!("{:>4}  {}", id, progress_cell(board.get(id)));
                if let Some(CardProgress::Loaded(record)) = board.get(id) {
                    println!(
                        "      pdf: {}  video: {}  tests: {}",
                        check(record.pdf_completed),
                        check(record.video_completed),
                        record.tests_label()
                    );
                }
            }
        }
        Commands::Complete {
            material_id,
            attachment_id,
        } => {
            let material = api.material(material_id).await?;
            let mut view = MaterialProgressView::new(material_id);
            view.mark_complete(&api, &attachment_id).await?;

            for item in view.attachment_checks(&material) {
                println!("[{}] {}", check(item.completed), item.name);
            }
            if let Some(record) = view.progress() {
                println!("{}% complete", record.rounded_percentage());
            }
        }
        Commands::Practice { material_id } => run_practice(&api, material_id).await?,
    }

    Ok(())
}

async fn run_exam(api: &ApiClient, num_questions: u32) -> Result<()> {
    let mut machine = ExamMachine::new();

    machine.mount(api).await?;
    if machine.state() == ExamState::Initial {
        machine.start(api, num_questions).await?;
    }

    if machine.state() == ExamState::AlreadyTaken {
        println!("You have already taken the final exam.");
        match machine.result_view() {
            Some(view) => print_result(&view),
            None => println!("(previous result unavailable)"),
        }
        return Ok(());
    }

    println!("Commands: <number> answer, n next, p prev, g <n> go to, s submit, q quit");

    while machine.state() == ExamState::Testing {
        if let Some(question) = machine.current_question() {
            print_question(
                question,
                machine.cursor(),
                machine.questions().len(),
                machine.selected_answer(question.id),
            );
        }

        let input = prompt("> ")?;
        let mut parts = input.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("n"), _) => {
                machine.next();
            }
            (Some("p"), _) => {
                machine.prev();
            }
            (Some("g"), Some(n)) => {
                let index = n.parse::<usize>().unwrap_or(0);
                if index == 0 || !machine.jump_to(index - 1) {
                    println!("No question {}.", n);
                }
            }
            (Some("s"), _) => {
                let outcome = machine
                    .submit(api, |answered, total| {
                        confirm(&format!(
                            "Only {} of {} answered; unanswered count as wrong. Submit? [y/N] ",
                            answered, total
                        ))
                    })
                    .await;

                match outcome {
                    Ok(SubmitOutcome::Submitted) => {}
                    Ok(SubmitOutcome::Declined) => println!("Not submitted."),
                    Err(e) if e.requires_login() => return Err(e.into()),
                    Err(e) => println!("Submit failed, your answers are kept: {}", e),
                }
            }
            (Some("q"), _) => {
                println!("Exam abandoned; answers discarded.");
                return Ok(());
            }
            (Some(choice), _) => {
                let Some(question) = machine.current_question().cloned() else {
                    continue;
                };
                match pick_option(&question, choice) {
                    Some(option) => {
                        machine.select_answer(question.id, option)?;
                        machine.next();
                    }
                    None => println!("Pick 1-{}.", question.options.len()),
                }
            }
            (None, _) => {}
        }
    }

    if let Some(view) = machine.result_view() {
        print_result(&view);
        if view.show_certificate {
            println!(
                "Download your certificate with `lesson-client certificate {}`.",
                view.session_id
            );
        }
    }
    Ok(())
}

async fn run_practice(api: &ApiClient, material_id: i64) -> Result<()> {
    let mut test = PracticeTest::load(api, material_id).await?;
    if test.questions().is_empty() {
        println!("Material {} has no tests.", material_id);
        return Ok(());
    }
    if test.already_submitted() {
        println!("You already submitted this test; submitting again updates your progress.");
    }

    let questions = test.questions().to_vec();
    let total = questions.len();
    for (index, question) in questions.iter().enumerate() {
        loop {
            print_question(question, index, total, None);
            let input = prompt("> ")?;
            match pick_option(question, input.trim()) {
                Some(option) => {
                    test.select_answer(question.id, option)?;
                    break;
                }
                None => println!("Pick 1-{}.", question.options.len()),
            }
        }
    }

    let result = test.submit(api).await?;
    println!(
        "{}/{} correct ({}%)",
        result.correct_count,
        result.total_tests,
        format_percentage(result.percentage())
    );
    for item in &result.results {
        if !item.is_correct {
            println!("  {}: correct answer is {}", item.question, item.correct_answer);
        }
    }
    if let Some(record) = test.progress() {
        println!("Material progress: {}%", record.rounded_percentage());
    }
    Ok(())
}

fn pick_option(question: &Question, choice: &str) -> Option<String> {
    let index = choice.parse::<usize>().ok()?.checked_sub(1)?;
    question.options.get(index).cloned()
}

fn print_question(question: &Question, index: usize, total: usize, selected: Option<&str>) {
    println!();
    println!("Question {}/{}: {}", index + 1, total, question.question);
    for (i, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(option.as_str()) { "*" } else { " " };
        println!(" {} {}. {}", marker, i + 1, option);
    }
}

fn print_result(view: &ResultView) {
    println!("{}", view.summary());
    println!(
        "{}",
        if view.passed {
            "Passed."
        } else {
            "Not passed."
        }
    );
}

fn print_result_line(view: &ResultView) {
    println!(
        "{}  {}  {}",
        view.session_id,
        view.summary(),
        if view.passed { "passed" } else { "failed" }
    );
}

fn progress_cell(progress: Option<&CardProgress>) -> String {
    match progress {
        Some(CardProgress::Loaded(record)) => format!("{:>3}%", record.rounded_percentage()),
        Some(CardProgress::Failed(_)) => "  n/a".to_string(),
        Some(CardProgress::Loading) | None => "  ...".to_string(),
    }
}

fn check(done: bool) -> &'static str {
    if done { "x" } else { " " }
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt("Password: "),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        bail!("stdin closed");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(question: &str) -> bool {
    prompt(question)
        .map(|answer| matches!(answer.trim(), "y" | "Y" | "yes"))
        .unwrap_or(false)
}
