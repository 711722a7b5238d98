use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use powr_core::publish::{retry_pending, JsonlEventSink, OfflinePublisher, Publication};
use powr_core::session::{CompletionOptions, SessionStatus, SessionStore, WorkoutInit};
use powr_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "powr")]
#[command(about = "Workout tracker with optional Nostr publishing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the exercise catalog
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Manage workout templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Record the active workout
    #[command(subcommand)]
    Workout(WorkoutCommand),

    /// Show finished workouts, newest first
    History {
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Write completed workouts to CSV, one row per set
    Export { path: PathBuf },

    /// Print the Nostr event for a stored record as JSON
    Event { entity: Entity, id: String },

    /// Import Nostr events from a JSON or JSONL file
    Import { path: PathBuf },

    /// Retry publications queued in the outbox
    Sync,
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// List catalog exercises, optionally filtered
    List {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        category: Option<ExerciseCategory>,
        #[arg(long = "type")]
        exercise_type: Option<ExerciseType>,
        #[arg(long)]
        equipment: Option<Equipment>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Add a custom exercise
    Add(ExerciseArgs),
    /// Replace a custom exercise's definition
    Update {
        id: String,
        #[command(flatten)]
        args: ExerciseArgs,
    },
    Delete { id: String },
}

#[derive(Args)]
struct ExerciseArgs {
    title: String,
    #[arg(long = "type", default_value = "strength")]
    exercise_type: ExerciseType,
    #[arg(long)]
    category: ExerciseCategory,
    #[arg(long)]
    equipment: Equipment,
    #[arg(long)]
    description: Option<String>,
    /// Repeatable
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Repeatable, in order
    #[arg(long = "instruction")]
    instructions: Vec<String>,
    #[arg(long, default_value = "kg")]
    unit: WeightUnit,
}

#[derive(Subcommand)]
enum TemplateCommand {
    List {
        /// Include archived templates
        #[arg(long)]
        all: bool,
    },
    /// Create a template from exercise plans
    Create {
        title: String,
        #[arg(long = "type", default_value = "strength")]
        template_type: WorkoutType,
        #[arg(long)]
        description: Option<String>,
        /// `<exercise_id>:<sets>:<reps>`, repeatable
        #[arg(long = "exercise", required = true)]
        exercises: Vec<String>,
    },
    Show { id: String },
    Delete { id: String },
    Archive {
        id: String,
        /// Restore an archived template
        #[arg(long)]
        undo: bool,
    },
    /// Save a finished workout as a new template
    FromWorkout {
        workout_id: String,
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// Start a new workout, blank or from a template
    Start {
        title: Option<String>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long = "type", default_value = "strength")]
        workout_type: WorkoutType,
        /// Replace an unfinished workout
        #[arg(long)]
        force: bool,
    },
    /// Add a catalog exercise by id or title
    AddExercise { exercise: String },
    RemoveExercise { exercise: usize },
    AddSet {
        exercise: usize,
        #[arg(long, default_value_t = 0.0)]
        weight: f64,
        #[arg(long)]
        reps: u32,
        #[arg(long)]
        rpe: Option<f32>,
        #[arg(long = "type", default_value = "normal")]
        set_type: SetType,
    },
    UpdateSet {
        exercise: usize,
        set: usize,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        reps: Option<u32>,
        #[arg(long)]
        rpe: Option<f32>,
        #[arg(long = "type")]
        set_type: Option<SetType>,
    },
    RemoveSet { exercise: usize, set: usize },
    /// Toggle a set's completion
    CompleteSet { exercise: usize, set: usize },
    Pause,
    Resume,
    /// Start (or stop) the rest timer
    Rest {
        seconds: Option<u32>,
        #[arg(long)]
        stop: bool,
    },
    Status {
        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },
    /// Complete and save the workout
    Finish {
        #[arg(long)]
        notes: Option<String>,
        /// Publish even if the config doesn't ask for it
        #[arg(long, conflicts_with = "no_publish")]
        publish: bool,
        #[arg(long)]
        no_publish: bool,
        /// Also save the workout as a new template with this title
        #[arg(long, conflicts_with = "update_template")]
        save_template: Option<String>,
        /// Overwrite the source template with what was performed
        #[arg(long)]
        update_template: bool,
    },
    /// Abandon the workout without saving
    Discard,
}

/// Files under the data directory
struct Paths {
    database: PathBuf,
    session: PathBuf,
    outbox: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        Self {
            database: data_dir.join("powr.db"),
            session: data_dir.join("active_workout.json"),
            outbox: data_dir.join("outbox.jsonl"),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    powr_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Using data directory {:?}", data_dir);
    let paths = Paths::new(&data_dir);

    let mut library = Library::open(&paths.database)?;
    library.seed_default_catalog()?;

    match cli.command {
        Commands::Exercise(cmd) => cmd_exercise(&mut library, cmd),
        Commands::Template(cmd) => cmd_template(&mut library, cmd),
        Commands::Workout(cmd) => cmd_workout(&mut library, &paths, &config, cmd),
        Commands::History { limit } => cmd_history(&library, limit),
        Commands::Export { path } => cmd_export(&library, &path),
        Commands::Event { entity, id } => cmd_event(&library, &config, entity, &id),
        Commands::Import { path } => cmd_import(&mut library, &path),
        Commands::Sync => cmd_sync(&mut library, &paths, &config),
    }
}

// ============================================================================
// Catalog and templates
// ============================================================================

fn new_exercise(args: ExerciseArgs) -> NewExercise {
    let mut new = NewExercise::new(
        args.title,
        args.exercise_type,
        args.category,
        args.equipment,
    );
    new.description = args.description;
    new.tags = args.tags;
    new.instructions = args.instructions;
    new.weight_unit = args.unit;
    if args.exercise_type == ExerciseType::Bodyweight {
        new.format.retain(|f| *f != FormatField::Weight);
    }
    new
}

fn cmd_exercise(library: &mut Library, cmd: ExerciseCommand) -> Result<()> {
    match cmd {
        ExerciseCommand::List {
            query,
            category,
            exercise_type,
            equipment,
            tag,
        } => {
            let filter = ExerciseFilter {
                query,
                category,
                exercise_type,
                equipment,
                tag,
            };
            let exercises = library.search_exercises(&filter)?;
            if exercises.is_empty() {
                println!("No exercises found.");
            }
            for exercise in exercises {
                println!(
                    "{:<28} {:<20} {:<8} {:<10} {}",
                    exercise.id,
                    exercise.title,
                    exercise.category,
                    exercise.equipment,
                    exercise.exercise_type
                );
            }
        }
        ExerciseCommand::Add(args) => {
            let exercise = library.create_exercise(new_exercise(args))?;
            println!("✓ Added exercise {}", exercise.title);
            println!("  ID: {}", exercise.id);
        }
        ExerciseCommand::Update { id, args } => {
            let exercise = library.update_exercise(&id, new_exercise(args))?;
            println!("✓ Updated exercise {}", exercise.title);
        }
        ExerciseCommand::Delete { id } => {
            library.delete_exercise(&id)?;
            println!("✓ Deleted exercise {}", id);
        }
    }
    Ok(())
}

/// Parse `<exercise_id>:<sets>:<reps>`; the id itself may contain colons
fn parse_plan(library: &Library, plan: &str) -> Result<TemplateExercise> {
    let mut parts = plan.rsplitn(3, ':');
    let (Some(reps), Some(sets), Some(id)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::Validation(format!(
            "expected <exercise_id>:<sets>:<reps>, got '{}'",
            plan
        )));
    };
    let number = |value: &str| {
        value
            .parse::<u32>()
            .map_err(|_| Error::Validation(format!("'{}' is not a number in '{}'", value, plan)))
    };
    let exercise = library.get_exercise(id)?;
    Ok(TemplateExercise::new(
        exercise.id,
        exercise.title,
        number(sets)?,
        number(reps)?,
    ))
}

fn cmd_template(library: &mut Library, cmd: TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::List { all } => {
            let templates = library.list_templates(all)?;
            if templates.is_empty() {
                println!("No templates found.");
            }
            for template in templates {
                let archived = if template.is_archived { " (archived)" } else { "" };
                println!(
                    "{:<28} {}{} - {} exercises",
                    template.id,
                    template.title,
                    archived,
                    template.exercises.len()
                );
            }
        }
        TemplateCommand::Create {
            title,
            template_type,
            description,
            exercises,
        } => {
            let exercises = exercises
                .iter()
                .map(|plan| parse_plan(library, plan))
                .collect::<Result<Vec<_>>>()?;
            let template = library.create_template(NewTemplate {
                title,
                template_type,
                description,
                exercises,
            })?;
            println!("✓ Created template {}", template.title);
            println!("  ID: {}", template.id);
        }
        TemplateCommand::Show { id } => {
            let template = library.get_template(&id)?;
            println!("{} ({})", template.title, template.template_type);
            if let Some(description) = &template.description {
                println!("  {}", description);
            }
            for (i, exercise) in template.exercises.iter().enumerate() {
                let weight = exercise
                    .target_weight
                    .map(|w| format!(" @ {}", w))
                    .unwrap_or_default();
                println!(
                    "  {}. {} - {}x{}{}",
                    i + 1,
                    exercise.title,
                    exercise.target_sets,
                    exercise.target_reps,
                    weight
                );
            }
        }
        TemplateCommand::Delete { id } => {
            library.delete_template(&id)?;
            println!("✓ Deleted template {}", id);
        }
        TemplateCommand::Archive { id, undo } => {
            library.archive_template(&id, !undo)?;
            if undo {
                println!("✓ Restored template {}", id);
            } else {
                println!("✓ Archived template {}", id);
            }
        }
        TemplateCommand::FromWorkout { workout_id, title } => {
            let workout = library.get_workout(&workout_id)?;
            let template = library.create_template_from_workout(&workout, title.as_deref())?;
            println!("✓ Created template {}", template.title);
            println!("  ID: {}", template.id);
        }
    }
    Ok(())
}

// ============================================================================
// Active workout
// ============================================================================

/// CLI positions are 1-based
fn position(n: usize, what: &str) -> Result<usize> {
    n.checked_sub(1)
        .ok_or_else(|| Error::Validation(format!("{} numbers start at 1", what)))
}

fn find_exercise(library: &Library, needle: &str) -> Result<BaseExercise> {
    match library.get_exercise(needle) {
        Err(Error::NotFound { .. }) => library
            .list_exercises()?
            .into_iter()
            .find(|e| e.title.eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::NotFound {
                entity: "exercise",
                id: needle.to_string(),
            }),
        other => other,
    }
}

fn cmd_workout(
    library: &mut Library,
    paths: &Paths,
    config: &Config,
    cmd: WorkoutCommand,
) -> Result<()> {
    let now = Utc::now();
    match cmd {
        WorkoutCommand::Start {
            title,
            template,
            workout_type,
            force,
        } => {
            let init = match template {
                Some(id) => WorkoutInit::FromTemplate(library.get_template(&id)?),
                None => WorkoutInit::Blank {
                    title: title.unwrap_or_else(|| "Workout".into()),
                    workout_type,
                },
            };
            let workout = SessionStore::update(&paths.session, |store| {
                if !force && matches!(store.status(), SessionStatus::Active | SessionStatus::Paused)
                {
                    return Err(Error::Session(
                        "a workout is already in progress (use --force to replace it)".into(),
                    ));
                }
                Ok(store.start_workout(init, now).clone())
            })?;
            println!("✓ Started {}", workout.title);
            print_exercises(&workout);
        }
        WorkoutCommand::AddExercise { exercise } => {
            let exercise = find_exercise(library, &exercise)?;
            let index = SessionStore::update(&paths.session, |store| {
                store.add_exercise(WorkoutExercise::from_exercise(&exercise))
            })?;
            println!("✓ Added {} as exercise {}", exercise.title, index + 1);
        }
        WorkoutCommand::RemoveExercise { exercise } => {
            let index = position(exercise, "exercise")?;
            let removed =
                SessionStore::update(&paths.session, |store| store.remove_exercise(index))?;
            println!("✓ Removed {}", removed.title);
        }
        WorkoutCommand::AddSet {
            exercise,
            weight,
            reps,
            rpe,
            set_type,
        } => {
            let index = position(exercise, "exercise")?;
            let mut set = WorkoutSet::new(weight, reps);
            set.rpe = rpe;
            set.set_type = set_type;
            let (set_index, volume) = SessionStore::update(&paths.session, |store| {
                let set_index = store.add_set(index, set)?;
                Ok((set_index, store.total_volume()))
            })?;
            println!(
                "✓ Set {} logged: {} x {} (total volume {})",
                set_index + 1,
                weight,
                reps,
                volume
            );
        }
        WorkoutCommand::UpdateSet {
            exercise,
            set,
            weight,
            reps,
            rpe,
            set_type,
        } => {
            let (e, s) = (position(exercise, "exercise")?, position(set, "set")?);
            let patch = SetPatch {
                weight,
                reps,
                rpe: rpe.map(Some),
                set_type,
            };
            let updated =
                SessionStore::update(&paths.session, |store| store.update_set(e, s, patch).cloned())?;
            println!("✓ Set {} is now {} x {}", set, updated.weight, updated.reps);
        }
        WorkoutCommand::RemoveSet { exercise, set } => {
            let (e, s) = (position(exercise, "exercise")?, position(set, "set")?);
            SessionStore::update(&paths.session, |store| store.remove_set(e, s))?;
            println!("✓ Removed set {}", set);
        }
        WorkoutCommand::CompleteSet { exercise, set } => {
            let (e, s) = (position(exercise, "exercise")?, position(set, "set")?);
            let done = SessionStore::update(&paths.session, |store| store.complete_set(e, s, now))?;
            if done {
                println!("✓ Set {} completed", set);
            } else {
                println!("Set {} marked not completed", set);
            }
        }
        WorkoutCommand::Pause => {
            SessionStore::update(&paths.session, |store| store.pause(now))?;
            println!("⏸ Paused");
        }
        WorkoutCommand::Resume => {
            SessionStore::update(&paths.session, |store| store.resume(now))?;
            println!("▶ Resumed");
        }
        WorkoutCommand::Rest { seconds, stop } => {
            if stop {
                SessionStore::update(&paths.session, |store| {
                    store.stop_rest();
                    Ok(())
                })?;
                println!("Rest timer stopped");
            } else {
                let seconds = seconds.unwrap_or(config.session.default_rest_seconds);
                SessionStore::update(&paths.session, |store| {
                    store.start_rest(seconds, now).map(|_| ())
                })?;
                println!("Rest {}s", seconds);
            }
        }
        WorkoutCommand::Status { json } => {
            let store = SessionStore::load(&paths.session)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&store)?);
            } else {
                print_status(&store, now);
            }
        }
        WorkoutCommand::Finish {
            notes,
            publish,
            no_publish,
            save_template,
            update_template,
        } => {
            let publish = publish || (config.nostr.publish && !no_publish);
            cmd_finish(library, paths, config, notes, publish)?;

            let action = match (save_template, update_template) {
                (Some(title), _) => TemplateAction::SaveAsNew { title },
                (None, true) => TemplateAction::UpdateExisting,
                (None, false) => TemplateAction::KeepOriginal,
            };
            let store = SessionStore::load(&paths.session)?;
            if let Some(workout) = store.workout() {
                if let Some(template) = library.apply_template_action(workout, action)? {
                    println!("✓ Saved template {} ({})", template.title, template.id);
                }
            }
        }
        WorkoutCommand::Discard => {
            let workout = SessionStore::update(&paths.session, |store| store.discard())?;
            println!("✓ Discarded {}", workout.title);
        }
    }
    Ok(())
}

fn publisher_for(config: &Config) -> Box<dyn Publisher> {
    match &config.nostr.events_file {
        Some(path) => Box::new(JsonlEventSink::new(path)),
        None => Box::new(OfflinePublisher),
    }
}

fn cmd_finish(
    library: &mut Library,
    paths: &Paths,
    config: &Config,
    notes: Option<String>,
    publish: bool,
) -> Result<()> {
    let mut publisher = publisher_for(config);
    let outbox = Outbox::new(&paths.outbox);

    let publication = if publish {
        Some(Publication {
            publisher: publisher.as_mut(),
            outbox: Some(&outbox),
            author: config.nostr.author(),
        })
    } else {
        None
    };
    let report = SessionStore::update(&paths.session, |store| {
        store.complete_workout(
            CompletionOptions { notes, publication },
            library,
            Utc::now(),
        )
    })?;

    let workout = &report.workout;
    println!("✓ Workout saved: {}", workout.title);
    println!("  ID: {}", workout.id);
    println!(
        "  Duration: {} min, {} sets, {} reps, volume {}",
        report.active_seconds / 60,
        workout.set_count(),
        workout.total_reps,
        workout.total_volume
    );
    match &report.publish {
        PublishStatus::NotRequested => {}
        PublishStatus::Published { relays, .. } => {
            println!("✓ Published to {}", relays.join(", "));
        }
        PublishStatus::Failed { reason, queued } => {
            println!("⚠ Not published: {}", reason);
            if *queued {
                println!("  Queued for `powr sync`");
            }
        }
    }
    Ok(())
}

fn print_exercises(workout: &Workout) {
    for (i, exercise) in workout.exercises.iter().enumerate() {
        println!("  {}. {}", i + 1, exercise.title);
        for (j, set) in exercise.sets.iter().enumerate() {
            let mark = if set.is_completed { "✓" } else { " " };
            let rpe = set.rpe.map(|r| format!(" @{}", r)).unwrap_or_default();
            println!(
                "     [{}] {}. {} x {}{} ({})",
                mark,
                j + 1,
                set.weight,
                set.reps,
                rpe,
                set.set_type
            );
        }
    }
}

fn print_status(store: &SessionStore, now: chrono::DateTime<Utc>) {
    let Some(workout) = store.workout() else {
        println!("No active workout.");
        return;
    };
    println!("{} [{:?}]", workout.title, store.status());
    let elapsed = store.elapsed(now).num_seconds();
    println!("  Elapsed: {}:{:02}", elapsed / 60, elapsed % 60);
    println!(
        "  Volume: {}  Reps: {}  Sets: {}/{}",
        store.total_volume(),
        store.total_reps(),
        store.completed_set_count(),
        workout.set_count()
    );
    if let Some(remaining) = store.rest_remaining(now) {
        println!("  Rest: {}s remaining", remaining);
    }
    print_exercises(workout);
}

// ============================================================================
// History, export and sync
// ============================================================================

fn cmd_history(library: &Library, limit: Option<u32>) -> Result<()> {
    let workouts = library.list_workouts(limit)?;
    if workouts.is_empty() {
        println!("No workouts recorded yet.");
        return Ok(());
    }
    for workout in &workouts {
        let published = if workout.availability.has(StorageSource::Nostr) {
            " [nostr]"
        } else {
            ""
        };
        println!(
            "{}  {:<20} {:>3} sets  volume {}{}",
            workout.start_time.format("%Y-%m-%d %H:%M"),
            workout.title,
            workout.set_count(),
            workout.total_volume,
            published
        );
    }
    let summary = HistorySummary::from_workouts(&workouts);
    println!();
    println!(
        "{} workouts, {} sets, {} reps, volume {}",
        summary.workouts, summary.total_sets, summary.total_reps, summary.total_volume
    );
    Ok(())
}

fn cmd_export(library: &Library, path: &Path) -> Result<()> {
    let workouts = library.list_workouts(None)?;
    let rows = powr_core::export::export_workouts_csv(&workouts, path)?;
    println!("✓ Exported {} sets to {}", rows, path.display());
    Ok(())
}

fn cmd_event(library: &Library, config: &Config, entity: Entity, id: &str) -> Result<()> {
    let author = config.nostr.author();
    let event = match entity {
        Entity::Exercise => library.exercise_event(id, author)?,
        Entity::Template => library.template_event(id, author)?,
        Entity::Workout => library.workout_event(id, author)?,
    };
    println!("{}", serde_json::to_string(&event)?);
    Ok(())
}

/// Accepts a single JSON event or one event per line
fn read_events(path: &Path) -> Result<Vec<NostrEvent>> {
    let contents = std::fs::read_to_string(path)?;
    if let Ok(event) = serde_json::from_str::<NostrEvent>(&contents) {
        return Ok(vec![event]);
    }
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

fn cmd_import(library: &mut Library, path: &Path) -> Result<()> {
    let events = read_events(path)?;
    let mut imported = 0;
    for event in &events {
        let result = match event.kind {
            powr_core::nostr::KIND_EXERCISE_TEMPLATE => {
                library.import_exercise_event(event).map(|e| e.title)
            }
            powr_core::nostr::KIND_WORKOUT_TEMPLATE => {
                library.import_template_event(event).map(|t| t.title)
            }
            powr_core::nostr::KIND_WORKOUT_RECORD => {
                library.import_workout_event(event).map(|w| w.title)
            }
            kind => Err(Error::Validation(format!("unsupported event kind {}", kind))),
        };
        match result {
            Ok(title) => {
                imported += 1;
                println!("✓ Imported {}", title);
            }
            Err(e) => eprintln!("Skipping event: {}", e),
        }
    }
    println!("Imported {} of {} events", imported, events.len());
    Ok(())
}

fn cmd_sync(library: &mut Library, paths: &Paths, config: &Config) -> Result<()> {
    let outbox = Outbox::new(&paths.outbox);
    let mut publisher = publisher_for(config);
    let summary = retry_pending(&outbox, publisher.as_mut(), library)?;
    println!(
        "Published {}, still pending {}, dropped {}",
        summary.published, summary.still_pending, summary.dropped
    );
    Ok(())
}
