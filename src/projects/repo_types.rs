use serde::{Deserialize, Deserializer, Serialize};

/// Descriptive fields shared by submissions and public project records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFields {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub idea: String,
    #[serde(default, deserialize_with = "comma_joined")]
    pub team_members: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub sec: Option<String>,
    #[serde(default, deserialize_with = "comma_joined")]
    pub tools: Option<String>,
    #[serde(default, deserialize_with = "comma_joined")]
    pub technologies: Option<String>,
}

impl ProjectFields {
    /// True when `term` occurs in the name, tools or technologies (case-sensitive).
    pub fn matches(&self, term: &str) -> bool {
        self.project_name.contains(term)
            || self.tools.as_deref().is_some_and(|t| t.contains(term))
            || self.technologies.as_deref().is_some_and(|t| t.contains(term))
    }
}

/// Clients send either `"a,b"` or `["a", "b"]`.
fn comma_joined<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(Option::<OneOrMany>::deserialize(de)?.map(|v| match v {
        OneOrMany::One(s) => s,
        OneOrMany::Many(items) => items.join(","),
    }))
}

/// Public, approved project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: i64,
    #[serde(flatten)]
    pub fields: ProjectFields,
}

/// Raw `projects` row.
#[derive(Debug, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub project_name: String,
    pub idea: String,
    pub team_members: Option<String>,
    pub roll_number: Option<String>,
    pub class_name: Option<String>,
    pub year: Option<i32>,
    pub branch: Option<String>,
    pub sec: Option<String>,
    pub tools: Option<String>,
    pub technologies: Option<String>,
}

impl From<ProjectRow> for Project {
    fn from(r: ProjectRow) -> Self {
        Self {
            id: r.id,
            fields: ProjectFields {
                project_name: r.project_name,
                idea: r.idea,
                team_members: r.team_members,
                roll_number: r.roll_number,
                class_name: r.class_name,
                year: r.year,
                branch: r.branch,
                sec: r.sec,
                tools: r.tools,
                technologies: r.technologies,
            },
        }
    }
}
