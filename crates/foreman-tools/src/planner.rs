//! `planned_tasks` tool: the task lifecycle surface exposed to the admin.

use serde_json::json;

use foreman_core::tasks::Task;
use foreman_core::tools::ToolResult;

use crate::errors::ToolError;
use crate::request::{PlannedTasksAction, PlannedTasksArgs};
use crate::traits::{TaskPlanner, TaskUpdate};

fn task_summary(verb: &str, task: &Task) -> String {
    format!(
        "{verb} task {} ({}, {} steps, status {})",
        task.task_id,
        task.title,
        task.steps.len(),
        task.status
    )
}

/// Run one `planned_tasks` action against the injected planner.
pub async fn execute(
    planner: &dyn TaskPlanner,
    args: &PlannedTasksArgs,
) -> Result<ToolResult, ToolError> {
    match args.action {
        PlannedTasksAction::NewTask => {
            let title = args
                .title
                .as_deref()
                .ok_or_else(|| ToolError::invalid("title is required for new_task"))?;
            let description = args.description.as_deref().unwrap_or_default();
            let task = planner.new_task(title, description, args.steps.clone()).await?;
            let summary = task_summary("Created", &task);
            Ok(ToolResult::ok(serde_json::to_value(&task)?, summary))
        }
        PlannedTasksAction::UpdateTask => {
            let task_id = args
                .task_id
                .as_deref()
                .ok_or_else(|| ToolError::invalid("taskId is required for update_task"))?;
            let task = planner
                .update_task(TaskUpdate {
                    task_id: task_id.to_string(),
                    step_number: args.step_number,
                    step_status: args.step_status,
                    step_output: args.step_output.clone(),
                })
                .await?;
            let summary = task_summary("Updated", &task);
            Ok(ToolResult::ok(serde_json::to_value(&task)?, summary))
        }
        PlannedTasksAction::LoadTask => {
            let task_id = args
                .task_id
                .as_deref()
                .ok_or_else(|| ToolError::invalid("taskId is required for load_task"))?;
            let task = planner.load_task(task_id).await?;
            let summary = task_summary("Loaded", &task);
            Ok(ToolResult::ok(serde_json::to_value(&task)?, summary))
        }
        PlannedTasksAction::ListTasks => {
            let tasks = planner.list_tasks().await?;
            let summary = format!("{} tasks on record", tasks.len());
            Ok(ToolResult::ok(json!({ "tasks": tasks }), summary))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use foreman_core::tasks::{StepDraft, TaskStatus, derive_task_id, normalize_steps};
    use foreman_core::tasks::{TaskMetadata, recompute_task_status};

    struct FakePlanner;

    fn make_task(title: &str, steps: Vec<StepDraft>) -> Task {
        let now = chrono::Utc::now();
        let steps = normalize_steps(steps);
        let status = recompute_task_status(&steps);
        Task {
            task_id: derive_task_id(title, now),
            title: title.to_string(),
            description: String::new(),
            status,
            steps,
            metadata: TaskMetadata {
                created_at: now.to_rfc3339(),
                updated_at: now.to_rfc3339(),
                tags: Vec::new(),
            },
        }
    }

    #[async_trait]
    impl TaskPlanner for FakePlanner {
        async fn new_task(
            &self,
            title: &str,
            _description: &str,
            steps: Vec<StepDraft>,
        ) -> Result<Task, ToolError> {
            Ok(make_task(title, steps))
        }

        async fn load_task(&self, task_id: &str) -> Result<Task, ToolError> {
            Err(ToolError::NotFound { message: format!("task {task_id}") })
        }

        async fn update_task(&self, update: TaskUpdate) -> Result<Task, ToolError> {
            assert_eq!(update.task_id, "t-1");
            Ok(make_task("updated", Vec::new()))
        }

        async fn list_tasks(&self) -> Result<Vec<Task>, ToolError> {
            Ok(vec![make_task("only", Vec::new())])
        }
    }

    #[tokio::test]
    async fn new_task_returns_task_document() {
        let args = PlannedTasksArgs {
            action: PlannedTasksAction::NewTask,
            title: Some("Research".to_string()),
            description: None,
            steps: vec![StepDraft { title: "Step one".to_string(), ..Default::default() }],
            task_id: None,
            step_number: None,
            step_status: None,
            step_output: None,
        };
        let result = execute(&FakePlanner, &args).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data["title"], "Research");
        assert_eq!(result.data["status"], TaskStatus::Pending.to_string());
    }

    #[tokio::test]
    async fn new_task_without_title_is_invalid() {
        let args = PlannedTasksArgs {
            action: PlannedTasksAction::NewTask,
            title: None,
            description: None,
            steps: Vec::new(),
            task_id: None,
            step_number: None,
            step_status: None,
            step_output: None,
        };
        let err = execute(&FakePlanner, &args).await.unwrap_err();
        assert_matches!(err, ToolError::InvalidArguments { .. });
    }

    #[tokio::test]
    async fn load_task_propagates_not_found() {
        let args = PlannedTasksArgs {
            action: PlannedTasksAction::LoadTask,
            title: None,
            description: None,
            steps: Vec::new(),
            task_id: Some("missing".to_string()),
            step_number: None,
            step_status: None,
            step_output: None,
        };
        let err = execute(&FakePlanner, &args).await.unwrap_err();
        assert_matches!(err, ToolError::NotFound { .. });
    }

    #[tokio::test]
    async fn list_tasks_counts_results() {
        let args = PlannedTasksArgs {
            action: PlannedTasksAction::ListTasks,
            title: None,
            description: None,
            steps: Vec::new(),
            task_id: None,
            step_number: None,
            step_status: None,
            step_output: None,
        };
        let result = execute(&FakePlanner, &args).await.unwrap();
        assert_eq!(result.summary, "1 tasks on record");
    }
}
