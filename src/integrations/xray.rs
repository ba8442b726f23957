use crate::config::XrayConfig;
use crate::data::TestDefinition;
use crate::integrations::HTTP_CLIENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

const XRAY_API_URL: &str = "https://xray.cloud.getxray.app/api/v2";
const TEST_TYPE: &str = "Manual (Gherkin)";

/// A test issue created in the test repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTest {
    pub issue_id: String,
    pub key: String,
}

/// The test-management side of test generation.
#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Creates `path` in the repository; an existing folder is not an error.
    async fn create_folder(&self, path: &str) -> Result<()>;
    async fn create_test(&self, definition: &TestDefinition, folder: &str) -> Result<CreatedTest>;
    async fn add_tests_to_plan(&self, plan_id: &str, test_ids: &[String]) -> Result<()>;
    /// Returns the key of the new plan.
    async fn create_test_plan(
        &self,
        name: &str,
        fix_versions: &[String],
        test_ids: &[String],
    ) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTestData {
    create_test: CreatedIssue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTestPlanData {
    create_test_plan: CreatedIssue,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    #[serde(alias = "testPlan")]
    test: TestNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestNode {
    issue_id: String,
    jira: JiraKey,
}

#[derive(Debug, Deserialize)]
struct JiraKey {
    key: String,
}

const CREATE_FOLDER: &str = r#"
    mutation($projectId: String!, $path: String!) {
        createFolder(projectId: $projectId, path: $path) { warnings }
    }
"#;

const CREATE_TEST: &str = r#"
    mutation($testType: String!, $gherkin: String!, $folder: String!, $jira: JSON!) {
        createTest(
            testType: { name: $testType },
            gherkin: $gherkin,
            folderPath: $folder,
            jira: $jira
        ) {
            test { issueId jira(fields: ["key"]) }
            warnings
        }
    }
"#;

const ADD_TO_PLAN: &str = r#"
    mutation($planId: String!, $testIds: [String]!) {
        addTestsToTestPlan(issueId: $planId, testIssueIds: $testIds) { addedTests warning }
    }
"#;

const CREATE_PLAN: &str = r#"
    mutation($testIds: [String], $jira: JSON!) {
        createTestPlan(testIssueIds: $testIds, jira: $jira) {
            testPlan { issueId jira(fields: ["key"]) }
            warnings
        }
    }
"#;

/// Xray Cloud GraphQL client. Authenticates on first use.
pub struct XrayClient {
    config: XrayConfig,
    token: Mutex<Option<String>>,
}

impl XrayClient {
    pub fn new(config: XrayConfig) -> Self {
        Self {
            config,
            token: Mutex::new(None),
        }
    }

    async fn bearer(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(t) = token.as_ref() {
            return Ok(t.clone());
        }

        let response = HTTP_CLIENT
            .post(format!("{}/authenticate", XRAY_API_URL))
            .json(&json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
            }))
            .send()
            .await
            .context("Xray authentication request failed")?
            .error_for_status()
            .context("Xray rejected the client credentials")?;
        let raw = response.text().await?;
        let bearer = format!("Bearer {}", raw.trim().trim_matches('"'));
        *token = Some(bearer.clone());
        tracing::debug!("Authenticated with Xray");
        Ok(bearer)
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let bearer = self.bearer().await?;
        let response = HTTP_CLIENT
            .post(format!("{}/graphql", XRAY_API_URL))
            .header("Authorization", bearer)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .context("Xray request failed")?
            .error_for_status()
            .context("Xray returned an error status")?;

        let body: GraphQLResponse<T> = response
            .json()
            .await
            .context("Failed to decode Xray response")?;
        graphql_data(body)
    }

    fn jira_fields(&self, summary: &str, description: &str) -> serde_json::Map<String, Value> {
        let mut fields = serde_json::Map::new();
        fields.insert("summary".into(), json!(summary));
        fields.insert("description".into(), json!(description));
        fields.insert("project".into(), json!({ "id": self.config.project_id }));
        fields
    }
}

fn graphql_data<T>(body: GraphQLResponse<T>) -> Result<T> {
    if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        anyhow::bail!("Xray: {}", messages.join("; "));
    }
    body.data.context("Xray returned no data")
}

#[async_trait]
impl TestRepository for XrayClient {
    async fn create_folder(&self, path: &str) -> Result<()> {
        if !path.starts_with('/') {
            anyhow::bail!("Folder {} must be a repository path starting with /", path);
        }
        let created: Result<Value> = self
            .graphql(
                CREATE_FOLDER,
                json!({ "projectId": self.config.project_id, "path": path }),
            )
            .await;
        match created {
            Ok(_) => tracing::debug!("Created Xray folder {}", path),
            Err(e) if e.to_string().contains("already exists") => {
                tracing::debug!("Xray folder {} already exists", path)
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn create_test(&self, definition: &TestDefinition, folder: &str) -> Result<CreatedTest> {
        let fields = self.jira_fields(&definition.name, &definition.description);
        let data: CreateTestData = self
            .graphql(
                CREATE_TEST,
                json!({
                    "testType": TEST_TYPE,
                    "gherkin": definition.gherkin(),
                    "folder": folder,
                    "jira": { "fields": fields },
                }),
            )
            .await?;
        let test = data.create_test.test;
        tracing::info!("Created test {} \"{}\"", test.jira.key, definition.name);
        Ok(CreatedTest {
            issue_id: test.issue_id,
            key: test.jira.key,
        })
    }

    async fn add_tests_to_plan(&self, plan_id: &str, test_ids: &[String]) -> Result<()> {
        let _: Value = self
            .graphql(ADD_TO_PLAN, json!({ "planId": plan_id, "testIds": test_ids }))
            .await?;
        tracing::info!("Added {} tests to plan {}", test_ids.len(), plan_id);
        Ok(())
    }

    async fn create_test_plan(
        &self,
        name: &str,
        fix_versions: &[String],
        test_ids: &[String],
    ) -> Result<String> {
        let mut fields = self.jira_fields(name, "Test Plan Description");
        let versions: Vec<Value> = fix_versions.iter().map(|v| json!({ "name": v })).collect();
        fields.insert("fixVersions".into(), Value::Array(versions));
        let data: CreateTestPlanData = self
            .graphql(
                CREATE_PLAN,
                json!({ "testIds": test_ids, "jira": { "fields": fields } }),
            )
            .await?;
        let key = data.create_test_plan.test.jira.key;
        tracing::info!("Created test plan {} \"{}\"", key, name);
        Ok(key)
    }
}
