//! Aggregate numbers over a project's tasks or a user's assignments.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Priority, ProjectId, Task, TaskStatus};
use crate::manager::is_blocked_in;
use crate::store::StoreView;
use crate::Result;

const UPCOMING_WINDOW_DAYS: i64 = 7;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub project_name: String,
    pub total_tasks: usize,
    /// Count per status code, every status present.
    pub status_breakdown: BTreeMap<String, usize>,
    /// Count per priority code, every priority present.
    pub priority_breakdown: BTreeMap<String, usize>,
    pub assignee_breakdown: BTreeMap<String, usize>,
    pub unassigned_tasks: usize,
    /// Open tasks whose due date has passed.
    pub overdue_tasks: usize,
    /// Percentage of tasks in DONE, 0 for an empty project.
    pub completion_rate: f64,
    /// Tasks due within the next seven days.
    pub upcoming_tasks: usize,
    /// Mean days from creation to last update over DONE tasks, one decimal.
    pub avg_completion_days: f64,
    pub blocked_tasks: usize,
}

impl ProjectMetrics {
    /// Compute metrics from task snapshots. `blocked_tasks` starts at zero.
    pub fn compute(project_name: &str, tasks: &[&Task], now: DateTime<Utc>) -> Self {
        let mut status_breakdown: BTreeMap<String, usize> = TaskStatus::ALL
            .iter()
            .map(|s| (s.code().to_string(), 0))
            .collect();
        let mut priority_breakdown: BTreeMap<String, usize> = Priority::ALL
            .iter()
            .map(|p| (p.code().to_string(), 0))
            .collect();
        let mut assignee_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        let mut unassigned_tasks = 0;

        for task in tasks {
            *status_breakdown.entry(task.status.code().to_string()).or_default() += 1;
            *priority_breakdown.entry(task.priority.code().to_string()).or_default() += 1;
            match &task.assignee {
                Some(user) => *assignee_breakdown.entry(user.clone()).or_default() += 1,
                None => unassigned_tasks += 1,
            }
        }

        let total_tasks = tasks.len();
        let done: Vec<&&Task> = tasks.iter().filter(|t| t.is_done()).collect();
        let completion_rate = if total_tasks > 0 {
            done.len() as f64 / total_tasks as f64 * 100.0
        } else {
            0.0
        };

        let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);
        let upcoming_tasks = tasks
            .iter()
            .filter(|t| t.due_date.is_some_and(|due| due >= now && due <= horizon))
            .count();

        let avg_completion_days = if done.is_empty() {
            0.0
        } else {
            let total_seconds: f64 = done
                .iter()
                .map(|t| (t.updated_at - t.created_at).num_seconds() as f64)
                .sum();
            round_one(total_seconds / done.len() as f64 / SECONDS_PER_DAY)
        };

        Self {
            project_name: project_name.to_string(),
            total_tasks,
            status_breakdown,
            priority_breakdown,
            assignee_breakdown,
            unassigned_tasks,
            overdue_tasks: tasks.iter().filter(|t| t.is_overdue(now)).count(),
            completion_rate,
            upcoming_tasks,
            avg_completion_days,
            blocked_tasks: 0,
        }
    }

    /// Metrics for one project, including how many of its tasks are blocked.
    pub fn for_project<V: StoreView + ?Sized>(
        view: &V,
        project: &ProjectId,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = view.get_project(project)?.name.clone();
        let tasks = view.tasks_in_project(project)?;
        let mut metrics = Self::compute(&name, &tasks, now);
        let mut blocked = 0;
        for task in &tasks {
            if is_blocked_in(view, &task.id)? {
                blocked += 1;
            }
        }
        metrics.blocked_tasks = blocked;
        Ok(metrics)
    }
}

/// Counted list of tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBucket {
    pub count: usize,
    pub tasks: Vec<Task>,
}

impl TaskBucket {
    fn collect_from<'a>(tasks: impl Iterator<Item = &'a Task>) -> Self {
        let tasks: Vec<Task> = tasks.cloned().collect();
        Self {
            count: tasks.len(),
            tasks,
        }
    }
}

/// Overview of the tasks assigned to one user across their projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user: String,
    pub total_assigned: usize,
    pub status_breakdown: BTreeMap<String, usize>,
    pub overdue: TaskBucket,
    /// Due between midnight today (UTC) and midnight tomorrow.
    pub due_today: TaskBucket,
    /// Due from tomorrow until a week after today's midnight.
    pub due_this_week: TaskBucket,
    /// DONE and updated within the last seven days.
    pub recently_completed: TaskBucket,
}

impl UserSummary {
    /// Summarize tasks assigned to `user` in projects the user belongs to.
    pub fn for_user<V: StoreView + ?Sized>(
        view: &V,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut assigned = Vec::new();
        for project in view.projects() {
            if !project.is_member(user) {
                continue;
            }
            assigned.extend(
                view.tasks_in_project(&project.id)?
                    .into_iter()
                    .filter(|t| t.assignee.as_deref() == Some(user)),
            );
        }
        Ok(Self::compute(user, &assigned, now))
    }

    pub fn compute(user: &str, assigned: &[&Task], now: DateTime<Utc>) -> Self {
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now);
        let today_end = today_start + Duration::days(1);
        let week_end = today_start + Duration::days(UPCOMING_WINDOW_DAYS);
        let completed_since = now - Duration::days(UPCOMING_WINDOW_DAYS);

        let due_within = |task: &&&Task, from: DateTime<Utc>, to: DateTime<Utc>| {
            task.due_date.is_some_and(|due| due >= from && due < to)
        };

        let mut status_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for task in assigned {
            *status_breakdown.entry(task.status.code().to_string()).or_default() += 1;
        }

        Self {
            user: user.to_string(),
            total_assigned: assigned.len(),
            status_breakdown,
            overdue: TaskBucket::collect_from(
                assigned.iter().filter(|t| t.is_overdue(now)).copied(),
            ),
            due_today: TaskBucket::collect_from(
                assigned
                    .iter()
                    .filter(|t| due_within(t, today_start, today_end))
                    .copied(),
            ),
            due_this_week: TaskBucket::collect_from(
                assigned
                    .iter()
                    .filter(|t| due_within(t, today_end, week_end))
                    .copied(),
            ),
            recently_completed: TaskBucket::collect_from(
                assigned
                    .iter()
                    .filter(|t| t.is_done() && t.updated_at >= completed_since)
                    .copied(),
            ),
        }
    }
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
