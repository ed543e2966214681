//! Talking to a Supabase database through its PostgREST API.
use std::fmt;

use habit_model::{DailyTask, Habit, MentalState, MonthKey};
use postgrest::Postgrest;
use serde::de::DeserializeOwned;

use crate::{
    PartitionData, RemoteStore, Role, StoreError,
    error::{UNEXPECTED_ERROR, error_message},
};

const HABITS: &str = "habits";
const DAILY_TASKS: &str = "daily_tasks";
const MENTAL_STATES: &str = "mental_states";
const PROFILES: &str = "profiles";

/// The columns a mental state is unique on.
const MENTAL_STATE_CONFLICT: &str = "user_id,month_key,day";

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &"<redacted>")
            .finish()
    }
}

impl SupabaseConfig {
    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self {
            supabase_url: env_var("SUPABASE_URL")?,
            supabase_anon_key: env_var("SUPABASE_ANON_KEY")?,
        })
    }
}

fn env_var(name: &'static str) -> Result<String, StoreError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(StoreError::NotInitialized(name))
}

#[derive(Clone)]
pub struct SupabaseStore {
    client: Postgrest,
}

impl SupabaseStore {
    /// `access_token` is the signed-in user's JWT; row-level security scopes every query to them.
    pub fn new(config: &SupabaseConfig, access_token: &str) -> Self {
        let SupabaseConfig {
            supabase_url,
            supabase_anon_key,
        } = config;

        let supabase_url = supabase_url.trim_end_matches('/');
        let client = Postgrest::new(format!("{supabase_url}/rest/v1"))
            .insert_header("apikey", supabase_anon_key.clone())
            .insert_header("Authorization", format!("Bearer {access_token}"));

        Self { client }
    }

    /// Configure from the environment. Without `SUPABASE_ACCESS_TOKEN` requests are made with the
    /// anon key only.
    pub fn from_env() -> Result<Self, StoreError> {
        let config = SupabaseConfig::from_env()?;
        let access_token = std::env::var("SUPABASE_ACCESS_TOKEN")
            .unwrap_or_else(|_| config.supabase_anon_key.clone());
        Ok(Self::new(&config, &access_token))
    }

    async fn select_partition<T: DeserializeOwned>(
        &self,
        table: &str,
        user_id: &str,
        month_key: MonthKey,
    ) -> Result<Vec<T>, StoreError> {
        let request = self
            .client
            .from(table)
            .select("*")
            .eq("user_id", user_id)
            .eq("month_key", month_key.to_string());
        let body = send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to parse {table} for {month_key}: {e:?}");
            StoreError::Transport(format!("Failed to read {table}: {e}"))
        })
    }

    async fn upsert(
        &self,
        table: &str,
        body: String,
        on_conflict: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut request = self.client.from(table).upsert(body);
        if let Some(columns) = on_conflict {
            request = request.on_conflict(columns);
        }

        send(request)
            .await
            .inspect_err(|e| log::error!("Supabase upsert into {table} failed: {e}"))?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        // Matching no rows is still a success, which keeps deletes idempotent.
        let request = self.client.from(table).eq("id", id).delete();
        send(request)
            .await
            .inspect_err(|e| log::error!("Supabase delete from {table} failed: {e}"))?;
        Ok(())
    }
}

fn transport(e: impl fmt::Display + fmt::Debug) -> StoreError {
    log::error!("Supabase request failed: {e:?}");
    StoreError::Transport(e.to_string())
}

fn to_body(record: &impl serde::Serialize) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|e| StoreError::Transport(e.to_string()))
}

/// Run a request and return the response body, or the store's own explanation if it refused.
async fn send(request: postgrest::Builder) -> Result<String, StoreError> {
    let response = request.execute().await.map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if status.is_success() {
        return Ok(body);
    }

    let message = error_message(&body)
        .unwrap_or_else(|| format!("{UNEXPECTED_ERROR} (status {})", status.as_u16()));
    Err(StoreError::Transport(message))
}

impl RemoteStore for SupabaseStore {
    async fn fetch_partition(
        &self,
        user_id: &str,
        month_key: MonthKey,
    ) -> Result<PartitionData, StoreError> {
        let (habits, tasks, mental_states) = futures::try_join!(
            self.select_partition::<Habit>(HABITS, user_id, month_key),
            self.select_partition::<DailyTask>(DAILY_TASKS, user_id, month_key),
            self.select_partition::<MentalState>(MENTAL_STATES, user_id, month_key),
        )
        .map_err(|e| {
            StoreError::Transport(format!(
                "Failed to load data from the database. Reason: {e}"
            ))
        })?;

        Ok(PartitionData {
            habits,
            tasks,
            mental_states,
        })
    }

    async fn upsert_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        self.upsert(HABITS, to_body(habit)?, None).await
    }

    async fn delete_habit(&self, id: &str) -> Result<(), StoreError> {
        self.delete(HABITS, id).await
    }

    async fn upsert_task(&self, task: &DailyTask) -> Result<(), StoreError> {
        self.upsert(DAILY_TASKS, to_body(task)?, None).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.delete(DAILY_TASKS, id).await
    }

    async fn upsert_mental_state(&self, state: &MentalState) -> Result<(), StoreError> {
        self.upsert(MENTAL_STATES, to_body(state)?, Some(MENTAL_STATE_CONFLICT))
            .await
    }

    async fn fetch_role(&self, user_id: &str) -> Result<Role, StoreError> {
        #[derive(serde::Deserialize)]
        struct ProfileRole {
            role: Option<String>,
        }

        let request = self.client.from(PROFILES).select("role").eq("id", user_id);
        let body = send(request).await?;
        let profiles: Vec<ProfileRole> = serde_json::from_str(&body)
            .map_err(|e| StoreError::Transport(format!("Failed to read profile: {e}")))?;

        Ok(Role::from_name(
            profiles.first().and_then(|profile| profile.role.as_deref()),
        ))
    }
}
