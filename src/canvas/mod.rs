pub mod dto;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header::LINK};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::optional;
use crate::error::AppError;
use crate::models::{Assignment, Course, Submission};

const PAGE_SIZE: &str = "100";

#[derive(Clone, Debug)]
pub struct CanvasConfig {
    /// Instance root, e.g. `https://school.instructure.com`, without a trailing slash.
    pub base_url: String,
    pub api_token: String,
    /// Explicit course scopes. Empty means every active enrollment.
    pub course_ids: Vec<String>,
}

impl CanvasConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = optional(lookup, "CANVAS_BASE_URL")
            .or_else(|| optional(lookup, "CANVAS_API_URL"))
            .ok_or_else(|| AppError::Config("CANVAS_BASE_URL is not set".to_string()))?
            .trim_end_matches('/')
            .trim_end_matches("/api/v1")
            .to_string();
        let api_token = optional(lookup, "CANVAS_API_TOKEN")
            .or_else(|| optional(lookup, "CANVAS_TOKEN"))
            .ok_or_else(|| AppError::Config("CANVAS_API_TOKEN is not set".to_string()))?;
        let course_ids = optional(lookup, "CANVAS_COURSE_IDS")
            .map(|raw| parse_course_ids(&raw))
            .unwrap_or_default();

        Ok(Self {
            base_url,
            api_token,
            course_ids,
        })
    }
}

fn parse_course_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read side of the sync: courses, their assignments, and the caller's submissions.
#[async_trait]
pub trait CanvasClient: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn fetch_course(&self, course_id: &str) -> Result<Course, AppError>;
    async fn list_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, AppError>;
    /// `Ok(None)` when Canvas has no submission for the current user.
    async fn fetch_submission(
        &self,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<Option<Submission>, AppError>;
}

pub struct CanvasHttpClient {
    client: Client,
    config: CanvasConfig,
}

impl CanvasHttpClient {
    pub fn new(config: CanvasConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, AppError> {
        let mut url = Url::parse(&format!("{}/api/v1{}", self.config.base_url, path))
            .map_err(|e| AppError::Config(format!("Invalid CANVAS_BASE_URL: {}", e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, AppError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await?;
        Ok(response)
    }

    /// Follows `Link: <...>; rel="next"` until Canvas stops sending one.
    async fn get_paginated<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, AppError> {
        let mut items = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            debug!("GET {}", url);
            let response = self.get(url).await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link)
                .and_then(|href| Url::parse(&href).ok());

            let page: Vec<T> = response.json().await?;
            items.extend(page);
        }

        Ok(items)
    }
}

#[async_trait]
impl CanvasClient for CanvasHttpClient {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let url = self.endpoint(
            "/courses",
            &[("enrollment_state", "active"), ("per_page", PAGE_SIZE)],
        )?;
        let courses: Vec<dto::CanvasCourse> = self.get_paginated(url).await?;
        Ok(courses.into_iter().map(Course::from).collect())
    }

    async fn fetch_course(&self, course_id: &str) -> Result<Course, AppError> {
        let url = self.endpoint(&format!("/courses/{}", course_id), &[])?;
        let response = self.get(url).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let course: dto::CanvasCourse = response.json().await?;
        Ok(course.into())
    }

    async fn list_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, AppError> {
        let url = self.endpoint(
            &format!("/courses/{}/assignments", course_id),
            &[("per_page", PAGE_SIZE), ("order_by", "due_at")],
        )?;
        let raw: Vec<dto::CanvasAssignment> = self.get_paginated(url).await?;
        Ok(raw
            .into_iter()
            .map(|a| a.into_assignment(course_id))
            .collect())
    }

    async fn fetch_submission(
        &self,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<Option<Submission>, AppError> {
        let url = self.endpoint(
            &format!(
                "/courses/{}/assignments/{}/submissions/self",
                course_id, assignment_id
            ),
            &[],
        )?;
        let response = self.get(url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let submission: Submission = response.json().await?;
        Ok(Some(submission))
    }
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_next_among_other_relations() {
        let header = concat!(
            "<https://school.instructure.com/api/v1/courses/1/assignments?page=1&per_page=100>; rel=\"current\",",
            "<https://school.instructure.com/api/v1/courses/1/assignments?page=2&per_page=100>; rel=\"next\",",
            "<https://school.instructure.com/api/v1/courses/1/assignments?page=1&per_page=100>; rel=\"first\""
        );
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://school.instructure.com/api/v1/courses/1/assignments?page=2&per_page=100")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let header = "<https://x/api/v1/courses?page=3>; rel=\"current\", <https://x/api/v1/courses?page=1>; rel=\"first\"";
        assert_eq!(next_link(header), None);
    }

    #[test]
    fn course_ids_skip_blanks() {
        assert_eq!(parse_course_ids(" 12 ,,34, "), vec!["12", "34"]);
    }
}
