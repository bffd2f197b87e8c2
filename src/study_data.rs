/*!
Loading of the flat study files and conversion of their records into `Template`s.

A study file has one template per line: the first token is the template id, the rest are `key:value` pairs.
The designated multi-field key (usually "Paper") carries two values as `key:value1:value2`.
```
use ccstudy::study_data::{FieldValue, StudyData};

let text = "# comment\nTARGET seq:ACDEFGH Coils:a Paper:abcdefg:1ABC\n";
let data = StudyData::parse(text, "Paper").unwrap();
assert_eq!(data.len(), 1);
let record = data.get("TARGET").unwrap();
assert_eq!(record.get("seq"), Some(&FieldValue::Single("ACDEFGH".to_string())));
assert_eq!(record.get("Paper"), Some(&FieldValue::Pair("abcdefg".to_string(), "1ABC".to_string())));
```
*/

use log::{trace, warn};
use rustc_hash::FxHashMap as HashMap;
use simple_error::bail;
use std::path::Path;

use crate::register::{expand_register, spread_register};
use crate::study_config::StudyConfig;
use crate::study_error::StudyError;

/// The record key holding the template sequence
pub const SEQUENCE_KEY: &str = "seq";

/// A value parsed from a `key:value` token
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Single(String),
    Pair(String, String)
}

impl FieldValue {
    /// The first (or only) value
    pub fn primary(&self) -> &str {
        match self {
            FieldValue::Single(v) => v,
            FieldValue::Pair(v, _) => v
        }
    }

    /// The second value, only present on the multi-field key
    pub fn secondary(&self) -> Option<&str> {
        match self {
            FieldValue::Single(_) => None,
            FieldValue::Pair(_, v) => Some(v)
        }
    }
}

/// All the key-value fields for one template line
pub type Record = HashMap<String, FieldValue>;

/// Parsed contents of a study file, in file order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StudyData {
    /// Template ids in the order they first appeared
    ids: Vec<String>,
    /// The record for each id
    records: HashMap<String, Record>
}

impl StudyData {
    /// Parses study text into records.
    /// # Arguments
    /// * `text` - the full file contents
    /// * `multi_field_key` - the one key whose tokens carry two values
    /// # Errors
    /// * if a token has no ':' separator, or if the multi-field key does not have exactly two values
    pub fn parse(text: &str, multi_field_key: &str) -> Result<StudyData, Box<dyn std::error::Error>> {
        let mut data = StudyData::default();
        for (line_index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let template_id = match tokens.next() {
                Some(t) => t.to_string(),
                None => continue
            };

            let mut record: Record = Default::default();
            for token in tokens {
                let (key, value) = parse_token(token, multi_field_key, line_index + 1)?;
                record.insert(key, value);
            }
            data.insert(template_id, record);
        }
        Ok(data)
    }

    /// Reads and parses a study file.
    /// # Arguments
    /// * `filename` - path to the study file
    /// * `multi_field_key` - the one key whose tokens carry two values
    /// # Errors
    /// * if the file cannot be read, or if parsing fails
    pub fn from_path(filename: &Path, multi_field_key: &str) -> Result<StudyData, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(filename)
            .map_err(|e| simple_error::simple_error!("Cannot open study file {}: {}", filename.display(), e))?;
        StudyData::parse(&text, multi_field_key)
    }

    /// Adds a record, replacing any earlier record with the same id.
    pub fn insert(&mut self, template_id: String, record: Record) {
        if self.records.contains_key(&template_id) {
            warn!("Template \"{template_id}\" appears more than once, keeping the last entry");
        } else {
            self.ids.push(template_id.clone());
        }
        self.records.insert(template_id, record);
    }

    pub fn get(&self, template_id: &str) -> Option<&Record> {
        self.records.get(template_id)
    }

    /// Iterates over (id, record) in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.ids.iter()
            .map(|id| (id.as_str(), &self.records[id]))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Splits one `key:value` token.
fn parse_token(token: &str, multi_field_key: &str, line_number: usize) -> Result<(String, FieldValue), StudyError> {
    let fields: Vec<&str> = token.split(':').collect();
    let format_error = |message: String| StudyError::DataFormat { line_number, message };

    if fields.len() < 2 {
        return Err(format_error(format!("token \"{token}\" has no ':'")));
    }

    let key = fields[0];
    if key == multi_field_key {
        if fields.len() != 3 {
            return Err(format_error(format!("key \"{key}\" expects two values, found {}", fields.len() - 1)));
        }
        Ok((key.to_string(), FieldValue::Pair(fields[1].to_string(), fields[2].to_string())))
    } else {
        // extra fields past the value are dropped
        Ok((key.to_string(), FieldValue::Single(fields[1].to_string())))
    }
}

/// A single method's register prediction for a template
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// The method that made the prediction
    method: String,
    /// The full register, one symbol per sequence column
    register: String,
    /// Extra value from the multi-field key, e.g. a literature reference
    annotation: Option<String>
}

impl Prediction {
    /// Constructor
    pub fn new(method: String, register: String, annotation: Option<String>) -> Prediction {
        Prediction {
            method,
            register,
            annotation
        }
    }

    // Getters
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn register(&self) -> &str {
        &self.register
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }
}

/// A sequence with the register predictions of each recognized method
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    /// The template identifier
    id: String,
    /// The residue sequence, may contain gaps
    sequence: String,
    /// Predictions ordered by method name
    predictions: Vec<Prediction>
}

impl Template {
    /// Constructor, predictions are re-ordered by name for stable iteration.
    /// Registers given one label per residue are spread over the sequence columns, see `spread_register`.
    pub fn new(id: String, sequence: String, mut predictions: Vec<Prediction>) -> Template {
        predictions.sort_by(|p1, p2| p1.method.cmp(&p2.method));
        for prediction in predictions.iter_mut() {
            prediction.register = spread_register(&prediction.register, &sequence);
        }
        Template {
            id,
            sequence,
            predictions
        }
    }

    /// Builds a template from a parsed record.
    /// Only methods recognized by `config.priorities` become predictions, everything else is ignored.
    /// A one letter prediction is a start label and gets expanded over the sequence.
    /// # Arguments
    /// * `template_id` - the record id
    /// * `record` - the parsed fields
    /// * `config` - provides the recognized methods and the gap policy
    /// # Errors
    /// * if the record has no sequence, or the sequence is not ASCII
    /// * if a one letter prediction is not a heptad label
    pub fn from_record(template_id: &str, record: &Record, config: &StudyConfig) -> Result<Template, Box<dyn std::error::Error>> {
        let sequence = match record.get(SEQUENCE_KEY) {
            Some(value) => value.primary().to_string(),
            None => return Err(Box::new(StudyError::MissingData {
                template_id: template_id.to_string(),
                field: SEQUENCE_KEY.to_string()
            }))
        };
        if !sequence.is_ascii() {
            bail!("Template \"{}\" has a non-ASCII sequence", template_id);
        }

        let mut predictions = vec![];
        for (key, value) in record.iter() {
            if key == SEQUENCE_KEY {
                continue;
            }
            if !config.priorities.is_recognized(key) {
                trace!("{template_id}: ignoring unrecognized key \"{key}\"");
                continue;
            }

            let raw = value.primary();
            let register = if raw.chars().count() == 1 {
                let start_label = raw.chars().next().unwrap_or_default();
                expand_register(start_label, &sequence, config.gap_policy)?
            } else {
                raw.to_string()
            };
            predictions.push(Prediction::new(key.clone(), register, value.secondary().map(|s| s.to_string())));
        }

        Ok(Template::new(template_id.to_string(), sequence, predictions))
    }

    // Getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    /// Returns the prediction of a method, if this template has one
    pub fn prediction(&self, method: &str) -> Option<&Prediction> {
        self.predictions.iter().find(|p| p.method == method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study_config::{GapPolicy, MethodPriorities, StudyConfigBuilder};

    #[test]
    fn test_parse_basic() {
        let text = "
# header comment
TARGET seq:ACDEFGH Coils:a struct:target.pdb

1ABC seq:ACDE Coils:abcd Paper:abcd:Smith2004
";
        let data = StudyData::parse(text, "Paper").unwrap();
        assert_eq!(data.len(), 2);
        let ids: Vec<&str> = data.iter().map(|(id, _r)| id).collect();
        assert_eq!(ids, vec!["TARGET", "1ABC"]);

        let record = data.get("1ABC").unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record["Coils"], FieldValue::Single("abcd".to_string()));
        assert_eq!(record["Paper"].primary(), "abcd");
        assert_eq!(record["Paper"].secondary(), Some("Smith2004"));
        assert_eq!(data.get("TARGET").unwrap()["struct"].primary(), "target.pdb");
    }

    #[test]
    fn test_parse_errors() {
        let err = StudyData::parse("T1 seq:ACDE Coils\n", "Paper").unwrap_err();
        assert_eq!(
            err.downcast_ref::<StudyError>(),
            Some(&StudyError::DataFormat { line_number: 1, message: "token \"Coils\" has no ':'".to_string() })
        );

        let err = StudyData::parse("\nT1 seq:ACDE Paper:abcd\n", "Paper").unwrap_err();
        assert!(matches!(err.downcast_ref::<StudyError>(), Some(StudyError::DataFormat { line_number: 2, .. })));
    }

    #[test_log::test]
    fn test_parse_duplicate() {
        let data = StudyData::parse("T1 seq:AAAA\nT2 seq:CCCC\nT1 seq:GGGG\n", "Paper").unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("T1").unwrap()["seq"].primary(), "GGGG");
    }

    #[test]
    fn test_from_path_missing() {
        let err = StudyData::from_path(Path::new("./tests/does_not_exist.dat"), "Paper").unwrap_err();
        assert!(err.to_string().starts_with("Cannot open study file"));
    }

    #[test]
    fn test_template_from_record() {
        let config = StudyConfigBuilder::default()
            .priorities(MethodPriorities::new(&["Paper", "Coils", "Marcoil"]))
            .build().unwrap();
        let data = StudyData::parse("T1 seq:ACDEFGHIK Marcoil:c Coils:abcdefgab Paper:cdefgabcd:ref Unknown:aaaaaaaaa\n", "Paper").unwrap();
        let template = Template::from_record("T1", data.get("T1").unwrap(), &config).unwrap();

        assert_eq!(template.id(), "T1");
        assert_eq!(template.sequence(), "ACDEFGHIK");
        let methods: Vec<&str> = template.predictions().iter().map(|p| p.method()).collect();
        assert_eq!(methods, vec!["Coils", "Marcoil", "Paper"]);
        assert_eq!(template.prediction("Marcoil").unwrap().register(), "cdefgabcd");
        assert_eq!(template.prediction("Paper").unwrap().annotation(), Some("ref"));
        assert!(template.prediction("Unknown").is_none());
    }

    #[test]
    fn test_template_gapped_label() {
        let config = StudyConfigBuilder::default()
            .gap_policy(GapPolicy::Consume)
            .build().unwrap();
        let data = StudyData::parse("T1 seq:AC-DE Coils:a\n", "Paper").unwrap();
        let template = Template::from_record("T1", data.get("T1").unwrap(), &config).unwrap();
        assert_eq!(template.prediction("Coils").unwrap().register(), "ab-de");
    }

    #[test]
    fn test_template_residue_length_register() {
        let config = StudyConfig::default();
        let data = StudyData::parse("T1 seq:AC-DEF.GH Coils:abcdefg Marcoil:ab-cde-fg\n", "Paper").unwrap();
        let template = Template::from_record("T1", data.get("T1").unwrap(), &config).unwrap();
        assert_eq!(template.prediction("Coils").unwrap().register(), "ab-cde-fg");
        assert_eq!(template.prediction("Marcoil").unwrap().register(), "ab-cde-fg");
    }

    #[test]
    fn test_template_non_ascii() {
        let config = StudyConfig::default();
        let data = StudyData::parse("T1 seq:ACDÉ Coils:a\n", "Paper").unwrap();
        let err = Template::from_record("T1", data.get("T1").unwrap(), &config).unwrap_err();
        assert_eq!(err.to_string(), "Template \"T1\" has a non-ASCII sequence");
    }

    #[test]
    fn test_template_missing_sequence() {
        let config = StudyConfig::default();
        let data = StudyData::parse("T1 Coils:abcd\n", "Paper").unwrap();
        let err = Template::from_record("T1", data.get("T1").unwrap(), &config).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StudyError>(),
            Some(&StudyError::MissingData { template_id: "T1".to_string(), field: "seq".to_string() })
        );
    }
}
