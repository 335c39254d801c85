use super::suggestion::MappingSuggestion;
use crate::error::OracleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// The external model that proposes mappings. One call per request, no retry.
#[async_trait]
pub trait SuggestionOracle: Send + Sync {
    /// Sends a prompt and returns the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Strips sensitive values from a sample record before it leaves the process.
pub trait Redactor: Send + Sync {
    fn redact(&self, record: &Value) -> Value;
}

/// Sends samples unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRedaction;

impl Redactor for NoRedaction {
    fn redact(&self, record: &Value) -> Value {
        record.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OracleOptions {
    /// Records sent per side.
    pub sample_limit: usize,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self { sample_limit: 5 }
    }
}

/// Sample data sent to the oracle: `{sourceData, targetData}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub source_data: Vec<Value>,
    pub target_data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub mappings: Vec<MappingSuggestion>,
}

pub struct SuggestionClient<O: SuggestionOracle> {
    oracle: O,
    redactor: Box<dyn Redactor>,
    options: OracleOptions,
}

pub struct SuggestionClientBuilder<O: SuggestionOracle> {
    oracle: O,
    redactor: Box<dyn Redactor>,
    options: OracleOptions,
}

impl<O: SuggestionOracle> SuggestionClientBuilder<O> {
    pub fn options(mut self, options: OracleOptions) -> Self {
        self.options = options;
        self
    }
    pub fn sample_limit(mut self, limit: usize) -> Self {
        self.options.sample_limit = limit;
        self
    }
    pub fn redactor(mut self, redactor: impl Redactor + 'static) -> Self {
        self.redactor = Box::new(redactor);
        self
    }
    pub fn build(self) -> SuggestionClient<O> {
        SuggestionClient {
            oracle: self.oracle,
            redactor: self.redactor,
            options: self.options,
        }
    }
}

impl<O: SuggestionOracle> SuggestionClient<O> {
    pub fn builder(oracle: O) -> SuggestionClientBuilder<O> {
        SuggestionClientBuilder {
            oracle,
            redactor: Box::new(NoRedaction),
            options: OracleOptions::default(),
        }
    }

    /// Caps and redacts both sample sets.
    pub fn request(&self, source: &[Value], target: &[Value]) -> Result<SuggestionRequest, OracleError> {
        if source.is_empty() {
            return Err(OracleError::EmptySamples("source"));
        }
        if target.is_empty() {
            return Err(OracleError::EmptySamples("target"));
        }
        let prepare = |records: &[Value]| -> Vec<Value> {
            records
                .iter()
                .take(self.options.sample_limit)
                .map(|r| self.redactor.redact(r))
                .collect()
        };
        Ok(SuggestionRequest {
            source_data: prepare(source),
            target_data: prepare(target),
        })
    }

    /// Asks the oracle for one mapping per target field.
    pub async fn suggest(&self, source: &[Value], target: &[Value]) -> Result<SuggestionResponse, OracleError> {
        let request = self.request(source, target)?;
        let prompt = build_prompt(&request);
        debug!(
            source_samples = request.source_data.len(),
            target_samples = request.target_data.len(),
            "Requesting mapping suggestions"
        );
        let text = self.oracle.complete(&prompt).await?;
        let mappings = parse_suggestions(&text)?;
        info!(suggestions = mappings.len(), "Received mapping suggestions");
        Ok(SuggestionResponse { mappings })
    }
}

const MAPPING_TYPES: &str = r#"- direct: {"target_field", "mapping_type": "direct", "source_field"}
- static: {"target_field", "mapping_type": "static", "value"}
- conditional: {"target_field", "mapping_type": "conditional", "source_field", "conditions": [{"condition", "value"}]}
- table: {"target_field", "mapping_type": "table", "source_field", "table": {"<source value>": "<target value>"}}
- date_conversion: {"target_field", "mapping_type": "date_conversion", "source_field", "format"}
- concat: {"target_field", "mapping_type": "concat", "source_fields": [...], "separator"}
- split: {"target_field", "mapping_type": "split", "source_field", "delimiter", "index"}
Use {"target_field", "mapping_type": "skip"} for a target field with no sensible source."#;

/// The prompt for one request: both sample sets plus the mapping schema.
pub fn build_prompt(request: &SuggestionRequest) -> String {
    let render = |records: &[Value]| serde_json::to_string_pretty(records).unwrap_or_default();
    format!(
        "Propose field mappings from the source records to the target records.\n\n\
         Source sample data:\n{}\n\n\
         Target sample data:\n{}\n\n\
         Answer with a JSON array containing one object per target field, each shaped as one of:\n{}\n",
        render(&request.source_data),
        render(&request.target_data),
        MAPPING_TYPES
    )
}

/// Extracts the suggestion array embedded in free-text oracle output.
///
/// The array spans from the first `[` to the last `]`.
pub fn parse_suggestions(text: &str) -> Result<Vec<MappingSuggestion>, OracleError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(OracleError::MissingArray);
    };
    if end < start {
        return Err(OracleError::MissingArray);
    }
    serde_json::from_str(&text[start..=end]).map_err(|e| OracleError::MalformedJson(e.to_string()))
}
