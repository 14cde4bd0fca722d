use crate::types::events::UsageMetadata;

/// Token usage summed over every `usageMetadata` the server reported.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    total_tokens: u64,
    prompt_tokens: u64,
    response_tokens: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn update_usage(&mut self, usage: &UsageMetadata) {
        self.total_tokens += usage.total_token_count() as u64;
        self.prompt_tokens += usage.prompt_token_count() as u64;
        self.response_tokens += usage.response_token_count() as u64;
        tracing::debug!(
            "total_tokens: {}, prompt_tokens: {}, response_tokens: {}",
            self.total_tokens,
            self.prompt_tokens,
            self.response_tokens
        );
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn prompt_tokens(&self) -> u64 {
        self.prompt_tokens
    }

    pub fn response_tokens(&self) -> u64 {
        self.response_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let mut stats = Stats::new();
        stats.update_usage(&UsageMetadata::new(10, 5));
        stats.update_usage(&UsageMetadata::new(3, 2));
        assert_eq!(stats.prompt_tokens(), 13);
        assert_eq!(stats.response_tokens(), 7);
        assert_eq!(stats.total_tokens(), 20);
    }
}
