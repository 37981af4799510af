use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};

use crate::subject::Subject;

/// One calendar event's worth of tracked time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub project: String,
    pub group: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub duration: Duration,
}

impl Task {
    pub fn new(subject: Subject, start: DateTime<FixedOffset>, duration: Duration) -> Self {
        Self {
            project: subject.project,
            group: subject.group,
            description: subject.description,
            start,
            duration,
        }
    }

    /// Calendar day of the start, in the zone the start was recorded in.
    pub fn day(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SummaryKey {
    pub group: String,
    pub description: String,
}

impl SummaryKey {
    fn for_task(task: &Task) -> Self {
        Self {
            group: task.group.clone(),
            description: task.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub group: String,
    pub description: String,
    pub total_duration: Duration,
    pub earliest_start: Option<DateTime<FixedOffset>>,
}

impl TaskSummary {
    fn new(key: &SummaryKey) -> Self {
        Self {
            group: key.group.clone(),
            description: key.description.clone(),
            total_duration: Duration::zero(),
            earliest_start: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub group: String,
    pub total_duration: Duration,
    pub earliest_start: Option<DateTime<FixedOffset>>,
}

impl GroupSummary {
    fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            total_duration: Duration::zero(),
            earliest_start: None,
        }
    }
}

/// All tasks sharing a project name, plus their per-group and per-(group, description) totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub tasks: Vec<Task>,
    pub task_summaries: BTreeMap<SummaryKey, TaskSummary>,
    pub group_summaries: BTreeMap<String, GroupSummary>,
}

impl Project {
    fn new(name: String) -> Self {
        Self {
            name,
            tasks: Vec::new(),
            task_summaries: BTreeMap::new(),
            group_summaries: BTreeMap::new(),
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.tasks
            .iter()
            .fold(Duration::zero(), |acc, task| acc + task.duration)
    }

    /// Sum of the durations of tasks that started on `day`.
    pub fn duration_on(&self, day: NaiveDate) -> Duration {
        self.tasks
            .iter()
            .filter(|task| task.day() == day)
            .fold(Duration::zero(), |acc, task| acc + task.duration)
    }

    pub fn first_start(&self) -> Option<DateTime<FixedOffset>> {
        self.tasks.first().map(|task| task.start)
    }

    /// Group summaries ordered by the start of their earliest task.
    pub fn groups_by_start(&self) -> Vec<&GroupSummary> {
        let mut groups = self.group_summaries.values().collect::<Vec<_>>();
        groups.sort_by_key(|summary| summary.earliest_start);
        groups
    }

    /// Task summaries ordered by the start of their earliest task.
    pub fn summaries_by_start(&self) -> Vec<&TaskSummary> {
        let mut summaries = self.task_summaries.values().collect::<Vec<_>>();
        summaries.sort_by_key(|summary| summary.earliest_start);
        summaries
    }

    fn summarize(&mut self) {
        self.tasks.sort_by_key(|task| task.start);

        for task in &self.tasks {
            let key = SummaryKey::for_task(task);
            let summary = self
                .task_summaries
                .entry(key)
                .or_insert_with_key(TaskSummary::new);
            summary.total_duration += task.duration;
            summary.earliest_start = Some(earliest(summary.earliest_start, task.start));

            let group = self
                .group_summaries
                .entry(task.group.clone())
                .or_insert_with_key(|group| GroupSummary::new(group));
            group.total_duration += task.duration;
            group.earliest_start = Some(earliest(group.earliest_start, task.start));
        }
    }
}

fn earliest(
    current: Option<DateTime<FixedOffset>>,
    candidate: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    match current {
        Some(current) if current <= candidate => current,
        _ => candidate,
    }
}

/// Partitions tasks by project, summarizes each project and orders projects by their first task.
///
/// Projects whose first tasks start at the same instant keep the order in which they were first
/// seen in `tasks`.
pub fn aggregate(tasks: &[Task]) -> Vec<Project> {
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();
    let mut projects: Vec<Project> = Vec::new();

    for task in tasks {
        let index = *index_by_name
            .entry(task.project.as_str())
            .or_insert_with(|| {
                projects.push(Project::new(task.project.clone()));
                projects.len() - 1
            });
        projects[index].tasks.push(task.clone());
    }

    for project in &mut projects {
        project.summarize();
    }

    projects.sort_by_key(|project| project.first_start());
    projects
}
