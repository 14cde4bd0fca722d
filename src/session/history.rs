use crate::session::dispatch::ChartSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
    Tool,
}

/// A web page cited by the model.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Source {
    uri: String,
    title: String,
}

impl Source {
    pub fn new(uri: &str, title: &str) -> Self {
        Self {
            uri: uri.to_string(),
            title: title.to_string(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryEntry {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chart: Option<ChartSpec>,
}

impl HistoryEntry {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        self.chart.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    sources: Vec<Source>,
    chart: Option<ChartSpec>,
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_chart(mut self, chart: ChartSpec) -> Self {
        self.chart = Some(chart);
        self
    }
}

/// The ordered conversation log.
///
/// Serializes as a plain array of entries so it can be persisted and restored
/// with [`History::from_entries`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Adds an entry, or grows the last user entry when `content` extends it.
    ///
    /// Whitespace-only content is dropped. Returns whether the history changed.
    pub fn append(&mut self, role: Role, content: &str, options: AppendOptions) -> bool {
        if content.trim().is_empty() {
            return false;
        }

        if role == Role::User {
            if let Some(last) = self.entries.last_mut() {
                if last.role == Role::User && content.starts_with(last.content.as_str()) {
                    last.content = content.to_string();
                    tracing::debug!("history: extended user entry to {:?}", content);
                    return true;
                }
            }
        }

        tracing::info!("history: {:?}: {}", role, content);
        self.entries.push(HistoryEntry {
            role,
            content: content.to_string(),
            sources: options.sources,
            chart: options.chart,
        });
        true
    }
}
