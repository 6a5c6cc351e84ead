use crate::{
    database::{MongoDB, PROJECTS},
    models::{CreateProjectRequest, PageQuery, Paginated, Project, ProjectResponse, UpdateProjectRequest},
    utils::time::now_ts,
    utils::validation::parse_object_id,
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};

fn clean_stack(stack: &[String]) -> Vec<String> {
    stack.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
}

async fn find_project(db: &MongoDB, project_id: &ObjectId) -> AppResult<Project> {
    db.collection::<Project>(PROJECTS)
        .find_one(doc! { "_id": project_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

async fn find_owned(db: &MongoDB, user_id: &ObjectId, project_id: &ObjectId) -> AppResult<Project> {
    let project = find_project(db, project_id).await?;
    if project.user_id != *user_id {
        return Err(AppError::Forbidden("Only the owner can change this project".into()));
    }
    Ok(project)
}

/// Public showcase, newest first.
pub async fn showcase(db: &MongoDB, paging: &PageQuery) -> AppResult<Paginated<ProjectResponse>> {
    let filter = doc! { "is_public": true };
    let collection = db.collection::<Project>(PROJECTS);

    let total = collection.count_documents(filter.clone()).await?;
    let projects: Vec<Project> = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(paging.skip())
        .limit(paging.limit())
        .await?
        .try_collect()
        .await?;

    Ok(Paginated::new(
        projects.into_iter().map(ProjectResponse::from).collect(),
        paging,
        total,
    ))
}

pub async fn mine(db: &MongoDB, user_id: &ObjectId) -> AppResult<Vec<ProjectResponse>> {
    let projects: Vec<Project> = db
        .collection::<Project>(PROJECTS)
        .find(doc! { "user_id": user_id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(projects.into_iter().map(ProjectResponse::from).collect())
}

/// Private projects read as missing for everyone but the owner.
pub async fn get(db: &MongoDB, project_id: &ObjectId, viewer: Option<&ObjectId>) -> AppResult<ProjectResponse> {
    let project = find_project(db, project_id).await?;
    if !project.visible_to(viewer) {
        return Err(AppError::NotFound("Project not found".into()));
    }
    Ok(ProjectResponse::from(project))
}

pub async fn create(db: &MongoDB, user_id: &ObjectId, request: &CreateProjectRequest) -> AppResult<ProjectResponse> {
    let course_id = request.course_id.as_deref().map(|raw| parse_object_id(raw, "course")).transpose()?;

    let now = now_ts();
    let mut project = Project {
        id: None,
        user_id: *user_id,
        course_id,
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        repo_url: request.repo_url.clone(),
        live_url: request.live_url.clone(),
        tech_stack: clean_stack(request.tech_stack.as_deref().unwrap_or_default()),
        is_public: request.is_public.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    let result = db.collection::<Project>(PROJECTS).insert_one(&project).await?;
    project.id = result.inserted_id.as_object_id();

    log::info!("🚀 Project '{}' published by {}", project.title, user_id);
    Ok(ProjectResponse::from(project))
}

fn project_changes(request: &UpdateProjectRequest) -> AppResult<Document> {
    let mut set = Document::new();
    if let Some(title) = &request.title {
        set.insert("title", title.trim());
    }
    if let Some(description) = &request.description {
        set.insert("description", description);
    }
    if let Some(url) = &request.repo_url {
        set.insert("repo_url", url);
    }
    if let Some(url) = &request.live_url {
        set.insert("live_url", url);
    }
    if let Some(stack) = &request.tech_stack {
        set.insert("tech_stack", to_bson(&clean_stack(stack))?);
    }
    if let Some(is_public) = request.is_public {
        set.insert("is_public", is_public);
    }
    Ok(set)
}

pub async fn update(
    db: &MongoDB,
    user_id: &ObjectId,
    project_id: &ObjectId,
    request: &UpdateProjectRequest,
) -> AppResult<ProjectResponse> {
    find_owned(db, user_id, project_id).await?;

    let mut set = project_changes(request)?;
    if !set.is_empty() {
        set.insert("updated_at", now_ts());
        db.collection::<Project>(PROJECTS)
            .update_one(doc! { "_id": project_id }, doc! { "$set": set })
            .await?;
    }

    find_project(db, project_id).await.map(ProjectResponse::from)
}

pub async fn delete(db: &MongoDB, user_id: &ObjectId, project_id: &ObjectId) -> AppResult<()> {
    find_owned(db, user_id, project_id).await?;
    db.collection::<Project>(PROJECTS).delete_one(doc! { "_id": project_id }).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_entries_are_trimmed() {
        let stack = vec![" Rust ".to_string(), "".to_string(), "MongoDB".to_string()];
        assert_eq!(clean_stack(&stack), vec!["Rust", "MongoDB"]);
    }

    #[test]
    fn visibility_toggle_is_applied() {
        let req = UpdateProjectRequest {
            title: None,
            description: None,
            repo_url: None,
            live_url: None,
            tech_stack: None,
            is_public: Some(false),
        };
        let set = project_changes(&req).unwrap();
        assert!(!set.get_bool("is_public").unwrap());
        assert_eq!(set.len(), 1);
    }
}
