use crate::study_config::GapPolicy;
use crate::study_error::StudyError;

/// The heptad alphabet in cycle order
pub const HEPTAD_LABELS: [u8; 7] = *b"abcdefg";
/// Symbol emitted in a register for a gap column
pub const GAP_SYMBOL: u8 = b'-';

/// Returns true if the residue symbol is an alignment gap ('-' or '.').
pub fn is_gap(symbol: u8) -> bool {
    symbol == b'-' || symbol == b'.'
}

/// Returns the number of non-gap residues in a sequence.
pub fn residue_count(sequence: &str) -> usize {
    sequence.bytes().filter(|&s| !is_gap(s)).count()
}

/// Returns the position of a heptad label in the cycle, or an error for anything outside a-g.
/// # Arguments
/// * `label` - the label to look up, case sensitive
pub fn label_index(label: u8) -> Result<usize, Box<dyn std::error::Error>> {
    match HEPTAD_LABELS.iter().position(|&l| l == label) {
        Some(i) => Ok(i),
        None => Err(Box::new(StudyError::InvalidLabel(label as char)))
    }
}

/// Expands a single starting heptad label into a full register for `sequence`.
/// The output has one symbol per sequence column, cycling through a-g.
/// Gap columns always receive `GAP_SYMBOL`; the `gap_policy` decides whether they also advance the cycle.
/// # Arguments
/// * `start_label` - the heptad label of the first residue
/// * `sequence` - the sequence to expand over, may contain gaps
/// * `gap_policy` - how gap columns interact with the cycle
/// # Errors
/// * if `start_label` is not a heptad label
/// # Examples
/// ```rust
/// use ccstudy::register::expand_register;
/// use ccstudy::study_config::GapPolicy;
/// assert_eq!(expand_register('f', "ACDEFGHIK", GapPolicy::Skip).unwrap(), "fgabcdefg");
/// assert_eq!(expand_register('a', "AC-DE", GapPolicy::Skip).unwrap(), "ab-cd");
/// assert_eq!(expand_register('a', "AC-DE", GapPolicy::Consume).unwrap(), "ab-de");
/// ```
pub fn expand_register(start_label: char, sequence: &str, gap_policy: GapPolicy) -> Result<String, Box<dyn std::error::Error>> {
    if !start_label.is_ascii() {
        return Err(Box::new(StudyError::InvalidLabel(start_label)));
    }
    let mut cycle = label_index(start_label as u8)?;
    let register: String = sequence.bytes()
        .map(|residue| {
            if is_gap(residue) {
                if gap_policy == GapPolicy::Consume {
                    cycle = (cycle + 1) % HEPTAD_LABELS.len();
                }
                GAP_SYMBOL as char
            } else {
                let label = HEPTAD_LABELS[cycle];
                cycle = (cycle + 1) % HEPTAD_LABELS.len();
                label as char
            }
        })
        .collect();
    Ok(register)
}

/// Continues the heptad cycle of `register` until it is `new_len` symbols long.
/// Used for candidates that have been padded past their original length.
/// A register that is already long enough is returned unchanged.
/// # Arguments
/// * `register` - a register whose last symbol is a heptad label
/// * `new_len` - the desired length
/// # Errors
/// * if `register` is empty or its last symbol is not a heptad label
/// # Examples
/// ```rust
/// use ccstudy::register::extend_register;
/// assert_eq!(extend_register("efg", 6).unwrap(), "efgabc");
/// ```
pub fn extend_register(register: &str, new_len: usize) -> Result<String, Box<dyn std::error::Error>> {
    let current = register.len();
    if current >= new_len {
        return Ok(register.to_string());
    }

    let last = match register.bytes().rev().find(|&s| s != GAP_SYMBOL) {
        Some(l) => l,
        None => return Err(Box::new(StudyError::LengthMismatch { register_len: 0, required_len: 1 }))
    };
    let last_index = label_index(last)?;
    let mut extended = String::with_capacity(new_len);
    extended.push_str(register);
    for i in 1..=(new_len - current) {
        extended.push(HEPTAD_LABELS[(last_index + i) % HEPTAD_LABELS.len()] as char);
    }
    Ok(extended)
}

/// Spreads a register written one label per residue over the columns of a gapped `sequence`, with `GAP_SYMBOL` on the gap columns.
/// Registers of any other length, and registers over ungapped sequences, are returned unchanged.
/// # Arguments
/// * `register` - the register as given by a prediction method
/// * `sequence` - the sequence the register describes
/// # Examples
/// ```rust
/// use ccstudy::register::spread_register;
/// assert_eq!(spread_register("abcd", "AC-DE"), "ab-cd");
/// assert_eq!(spread_register("ab-cd", "AC-DE"), "ab-cd");
/// assert_eq!(spread_register("abcd", "ACDE"), "abcd");
/// ```
pub fn spread_register(register: &str, sequence: &str) -> String {
    let residues = residue_count(sequence);
    if register.len() != residues || residues == sequence.len() {
        return register.to_string();
    }

    let mut labels = register.bytes();
    sequence.bytes()
        .map(|s| {
            if is_gap(s) {
                GAP_SYMBOL as char
            } else {
                labels.next().unwrap_or(GAP_SYMBOL) as char
            }
        })
        .collect()
}

/// Returns the label a register gives to the `ordinal`-th residue, found at `column`
fn label_at(register: &[u8], by_column: bool, column: usize, ordinal: usize) -> u8 {
    if by_column {
        register[column]
    } else {
        register[ordinal]
    }
}

/// Returns true if two registers assign the same heptad label to every residue of `reference`.
/// A register that reaches the last residue column of `reference` is read by column, with gap columns ignored.
/// A shorter register is read one label per residue.
/// This relation is reflexive and symmetric.
/// # Arguments
/// * `register_a` - the first register
/// * `register_b` - the second register
/// * `reference` - the sequence both registers describe
/// # Errors
/// * if either register is shorter than the residue count of `reference`
/// # Examples
/// ```rust
/// use ccstudy::register::same_register;
/// assert!(same_register("abcd", "abcd", "ACDE").unwrap());
/// assert!(!same_register("abcd", "abcx", "ACDE").unwrap());
/// assert!(same_register("ab-d", "abxd", "AC-E").unwrap());
/// assert!(same_register("abcd", "ab-cd", "AC-DE").unwrap());
/// ```
pub fn same_register(register_a: &str, register_b: &str, reference: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let required_len = residue_count(reference);
    for register in [register_a, register_b] {
        if register.len() < required_len {
            return Err(Box::new(StudyError::LengthMismatch {
                register_len: register.len(),
                required_len
            }));
        }
    }

    let reference = reference.as_bytes();
    let columns = reference.iter()
        .rposition(|&s| !is_gap(s))
        .map_or(0, |last| last + 1);
    let a = register_a.as_bytes();
    let b = register_b.as_bytes();
    let a_by_column = a.len() >= columns;
    let b_by_column = b.len() >= columns;
    Ok(reference.iter()
        .enumerate()
        .filter(|(_c, s)| !is_gap(**s))
        .enumerate()
        .all(|(ordinal, (column, _s))| {
            label_at(a, a_by_column, column, ordinal) == label_at(b, b_by_column, column, ordinal)
        }))
}
