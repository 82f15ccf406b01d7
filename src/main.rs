use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use taskgraph::activity::{ChannelRecorder, JsonlRecorder};
use taskgraph::config::Config;
use taskgraph::core::{
    CommentId, Priority, Project, ProjectId, Task, TaskId, TaskList, TaskListId, TaskStatus,
};
use taskgraph::filter::TaskFilter;
use taskgraph::metrics::{ProjectMetrics, UserSummary};
use taskgraph::store::{FileStore, StoreView, TaskStore};
use taskgraph::{tlog, tlog_error, DependencyManager, DependencyResponse, Result, TaskUpdate};

const ACTIVITY_QUEUE_CAPACITY: usize = 256;

/// taskgraph - projects, task lists and task dependencies
#[derive(Parser, Debug)]
#[command(name = "taskgraph")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    TASKGRAPH_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.taskgraph/taskgraph.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Store file to use instead of the configured one
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Name recorded as the actor of changes
    #[arg(long, global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage task lists
    #[command(subcommand)]
    List(ListCommand),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage dependencies between tasks
    #[command(subcommand)]
    Dep(DepCommand),

    /// Manage comments on tasks
    #[command(subcommand)]
    Comment(CommentCommand),

    /// Show aggregate numbers for a project
    Metrics { project: ProjectId },

    /// Summarize the tasks assigned to a user (defaults to the actor)
    Summary { user: Option<String> },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ProjectCommand {
    /// Create a project owned by the actor
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List all projects
    Ls,
    /// Add a member to a project
    AddMember { project: ProjectId, user: String },
    /// Delete a project with all its lists and tasks
    Rm { project: ProjectId },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ListCommand {
    /// Create a task list inside a project
    Add {
        project: ProjectId,
        name: String,
        #[arg(long, default_value_t = 0)]
        position: i32,
    },
    /// Delete a task list with its tasks
    Rm { list: TaskListId },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TaskCommand {
    /// Create a task inside a list
    Add {
        list: TaskListId,
        title: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Due date in RFC 3339 form, e.g. 2026-11-01T17:00:00Z
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, default_value_t = 0)]
        position: i32,
    },
    /// List tasks, optionally filtered
    Ls(TaskListArgs),
    /// Change a task's title, description, priority, due date or hours
    Edit(TaskEditArgs),
    /// Set a task's position, optionally moving it to another list
    Move {
        task: TaskId,
        position: i32,
        /// Target list in the same project
        #[arg(long)]
        list: Option<TaskListId>,
    },
    /// Change a task's status
    Status { task: TaskId, status: TaskStatus },
    /// Assign a task, or clear the assignee when no user is given
    Assign { task: TaskId, user: Option<String> },
    /// Delete a task and its dependency edges
    Rm { task: TaskId },
    /// Open tasks of a project whose dependencies are all done
    Ready { project: ProjectId },
    /// Tasks of a project in dependency order
    Order { project: ProjectId },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TaskListArgs {
    /// Restrict to one project
    #[arg(long)]
    pub project: Option<ProjectId>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long = "status")]
    pub statuses: Vec<TaskStatus>,
    #[arg(long = "priority")]
    pub priorities: Vec<Priority>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub unassigned: bool,
    /// Only tasks with an unfinished dependency
    #[arg(long, conflicts_with = "unblocked")]
    pub blocked: bool,
    /// Only tasks without an unfinished dependency
    #[arg(long)]
    pub unblocked: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TaskEditArgs {
    pub task: TaskId,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Due date in RFC 3339 form
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<DateTime<Utc>>,
    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
    #[arg(long)]
    pub estimated_hours: Option<f64>,
    #[arg(long)]
    pub actual_hours: Option<f64>,
}

impl From<TaskEditArgs> for TaskUpdate {
    fn from(args: TaskEditArgs) -> Self {
        TaskUpdate {
            title: args.title,
            description: args.description,
            priority: args.priority,
            due_date: if args.clear_due {
                Some(None)
            } else {
                args.due.map(Some)
            },
            estimated_hours: args.estimated_hours,
            actual_hours: args.actual_hours,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CommentCommand {
    /// Comment on a task as the actor
    Add { task: TaskId, content: String },
    /// Show comments on a task, newest first
    Ls { task: TaskId },
    /// Replace the text of one of the actor's comments
    Edit { comment: CommentId, content: String },
    /// Delete one of the actor's comments
    Rm { comment: CommentId },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DepCommand {
    /// Make TASK depend on DEPENDENCY
    Add { task: TaskId, dependency: TaskId },
    /// Remove the dependency of TASK on DEPENDENCY
    Rm { task: TaskId, dependency: TaskId },
    /// Show what a task depends on
    Ls { task: TaskId },
    /// Show tasks that depend on a task
    Dependents { task: TaskId },
    /// Show unfinished dependencies of a task
    Blocking { task: TaskId },
}

fn main() {
    let cli = Cli::parse();
    taskgraph::log::init_with_debug(cli.debug);

    match run(cli) {
        Ok(success) => {
            if !success {
                std::process::exit(1);
            }
        }
        Err(err) => {
            tlog_error!("Command failed: {}", err);
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when a dependency command was rejected.
fn run(cli: Cli) -> Result<bool> {
    let config = Config::load()?;
    let store_path = match cli.store {
        Some(path) => path,
        None => config.store_path()?,
    };
    let actor = cli.actor.unwrap_or_else(|| config.effective_actor());
    let store = Arc::new(FileStore::open(&store_path)?);
    tlog!("Command {:?} by {} on {}", cli.command, actor, store.path().display());
    let (recorder, writer) = ChannelRecorder::spawn(
        JsonlRecorder::new(&config.activity_log_path()?),
        ACTIVITY_QUEUE_CAPACITY,
    );
    let manager = DependencyManager::with_recorder(store, Arc::new(recorder));

    let result = dispatch(&manager, &actor, cli.command);

    // Dropping the manager closes the queue so the writer can drain and exit.
    drop(manager);
    if writer.join().is_err() {
        tlog_error!("Activity writer thread panicked");
    }
    result
}

fn dispatch(manager: &DependencyManager<FileStore>, actor: &str, command: Command) -> Result<bool> {
    match command {
        Command::Project(cmd) => run_project(manager.store(), actor, cmd).map(|()| true),
        Command::List(cmd) => run_list(manager.store(), cmd).map(|()| true),
        Command::Task(cmd) => run_task(manager, actor, cmd).map(|()| true),
        Command::Dep(cmd) => run_dep(manager, actor, cmd),
        Command::Comment(cmd) => run_comment(manager, actor, cmd).map(|()| true),
        Command::Metrics { project } => {
            let metrics = manager
                .store()
                .read(|view| ProjectMetrics::for_project(view, &project, Utc::now()))?;
            print_json(&metrics).map(|()| true)
        }
        Command::Summary { user } => {
            let user = user.unwrap_or_else(|| actor.to_string());
            let summary = manager
                .store()
                .read(|view| UserSummary::for_user(view, &user, Utc::now()))?;
            print_json(&summary).map(|()| true)
        }
    }
}

fn run_project(store: &FileStore, actor: &str, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Add { name, description } => {
            let mut project = Project::new(&name, actor);
            project.description = description;
            let id = project.id;
            store.transaction(|txn| txn.insert_project(project))?;
            println!("{}", id);
        }
        ProjectCommand::Ls => {
            let projects: Vec<Project> =
                store.read(|view| Ok(view.projects().into_iter().cloned().collect()))?;
            print_json(&projects)?;
        }
        ProjectCommand::AddMember { project, user } => {
            store.transaction(|txn| {
                txn.get_project_mut(&project)?.add_member(&user);
                Ok(())
            })?;
        }
        ProjectCommand::Rm { project } => {
            let removed = store.transaction(|txn| txn.delete_project(&project))?;
            println!("deleted project {} ({} tasks)", project, removed);
        }
    }
    Ok(())
}

fn run_list(store: &FileStore, cmd: ListCommand) -> Result<()> {
    match cmd {
        ListCommand::Add {
            project,
            name,
            position,
        } => {
            let list = TaskList::new(project, &name).with_position(position);
            let id = list.id;
            store.transaction(|txn| txn.insert_task_list(list))?;
            println!("{}", id);
        }
        ListCommand::Rm { list } => {
            let removed = store.transaction(|txn| txn.delete_task_list(&list))?;
            println!("deleted list {} ({} tasks)", list, removed);
        }
    }
    Ok(())
}

fn run_task(manager: &DependencyManager<FileStore>, actor: &str, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Add {
            list,
            title,
            priority,
            due,
            assignee,
            position,
        } => {
            let mut task = Task::new(list, &title, actor)
                .with_priority(priority)
                .with_position(position);
            task.due_date = due;
            task.assignee = assignee;
            let id = task.id;
            manager.store().transaction(|txn| txn.insert_task(task))?;
            println!("{}", id);
        }
        TaskCommand::Ls(args) => {
            let filter = TaskFilter {
                title: args.title,
                statuses: args.statuses,
                priorities: args.priorities,
                assignee: args.assignee,
                unassigned: args.unassigned.then_some(true),
                blocked: if args.blocked {
                    Some(true)
                } else if args.unblocked {
                    Some(false)
                } else {
                    None
                },
                ..TaskFilter::default()
            };
            let tasks: Vec<Task> = manager.store().read(|view| {
                let candidates = match &args.project {
                    Some(project) => view.tasks_in_project(project)?,
                    None => view.tasks(),
                };
                Ok(filter
                    .apply(view, candidates)?
                    .into_iter()
                    .cloned()
                    .collect())
            })?;
            print_json(&tasks)?;
        }
        TaskCommand::Edit(args) => {
            let task = args.task;
            print_json(&manager.update_task(actor, &task, args.into())?)?;
        }
        TaskCommand::Move {
            task,
            position,
            list,
        } => print_json(&manager.move_task(actor, &task, list, position)?)?,
        TaskCommand::Status { task, status } => {
            let previous = manager.set_status(actor, &task, status)?;
            println!("{} -> {}", previous.code(), status.code());
        }
        TaskCommand::Assign { task, user } => {
            let previous = manager.assign(actor, &task, user.as_deref())?;
            println!(
                "{} -> {}",
                previous.as_deref().unwrap_or("-"),
                user.as_deref().unwrap_or("-")
            );
        }
        TaskCommand::Rm { task } => {
            let removed = manager.store().transaction(|txn| txn.delete_task(&task))?;
            println!("deleted task {} ({})", task, removed.title);
        }
        TaskCommand::Ready { project } => print_json(&manager.ready_tasks(&project)?)?,
        TaskCommand::Order { project } => print_json(&manager.execution_order(&project)?)?,
    }
    Ok(())
}

fn run_dep(manager: &DependencyManager<FileStore>, actor: &str, cmd: DepCommand) -> Result<bool> {
    match cmd {
        DepCommand::Add { task, dependency } => {
            let response =
                DependencyResponse::from_add(manager.add_dependency(actor, &task, &dependency));
            print_json(&response.to_json())?;
            Ok(response.is_success())
        }
        DepCommand::Rm { task, dependency } => {
            let response = DependencyResponse::from_remove(
                manager.remove_dependency(actor, &task, &dependency),
            );
            print_json(&response.to_json())?;
            Ok(response.is_success())
        }
        DepCommand::Ls { task } => print_json(&manager.list_dependencies(&task)?).map(|()| true),
        DepCommand::Dependents { task } => {
            print_json(&manager.list_dependents(&task)?).map(|()| true)
        }
        DepCommand::Blocking { task } => {
            print_json(&manager.blocking_tasks(&task)?).map(|()| true)
        }
    }
}

fn run_comment(
    manager: &DependencyManager<FileStore>,
    actor: &str,
    cmd: CommentCommand,
) -> Result<()> {
    match cmd {
        CommentCommand::Add { task, content } => {
            println!("{}", manager.add_comment(actor, &task, &content)?.id);
        }
        CommentCommand::Ls { task } => print_json(&manager.list_comments(&task)?)?,
        CommentCommand::Edit { comment, content } => {
            print_json(&manager.edit_comment(actor, &comment, &content)?)?;
        }
        CommentCommand::Rm { comment } => {
            manager.delete_comment(actor, &comment)?;
            println!("deleted comment {}", comment);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
