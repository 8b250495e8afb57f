use std::collections::{BTreeMap, HashMap};

/// Server-assigned opaque identity, stable for the lifetime of a connection.
pub type ClientId = String;

/// One finalized turn as broadcast by the server: every connected client is
/// present, clients without observed input map to an empty list.
pub type TurnRow = BTreeMap<ClientId, Vec<RawInput>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Movement {
    #[default]
    Stop,
    Up,
    Down,
    Left,
    Right,
}

/// A single captured input. `{stop, false}` is the empty input and is never
/// transmitted or stored in per-turn lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct RawInput {
    pub movement: Movement,
    pub shoot: bool,
}

impl RawInput {
    pub const EMPTY: RawInput = RawInput {
        movement: Movement::Stop,
        shoot: false,
    };

    pub fn new(movement: Movement, shoot: bool) -> Self {
        Self { movement, shoot }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// Fold a per-turn input list to the single input applied at the turn
/// boundary: movement is the last non-stop movement in capture order, shoot
/// is true if any entry shot. `merge(&[])` is the empty input, and appending
/// empty inputs never changes the result.
pub fn merge(inputs: &[RawInput]) -> RawInput {
    let mut merged = RawInput::EMPTY;
    for input in inputs {
        if input.movement != Movement::Stop {
            merged.movement = input.movement;
        }
        if input.shoot {
            merged.shoot = true;
        }
    }
    merged
}

/// The per-turn input view handed to the simulation: one merged input per
/// client, the empty input for anyone absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnInputs {
    merged: HashMap<ClientId, RawInput>,
}

impl TurnInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table with the merged view of a received turn row.
    pub fn install(&mut self, row: &TurnRow) {
        self.merged.clear();
        for (client_id, inputs) in row {
            self.merged.insert(client_id.clone(), merge(inputs));
        }
    }

    /// Non-input frames apply the empty input to every client.
    pub fn clear(&mut self) {
        self.merged.clear();
    }

    pub fn get(&self, client_id: &str) -> RawInput {
        self.merged.get(client_id).copied().unwrap_or(RawInput::EMPTY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &RawInput)> {
        self.merged.iter()
    }

    pub fn is_clear(&self) -> bool {
        self.merged.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(movement: Movement, shoot: bool) -> RawInput {
        RawInput::new(movement, shoot)
    }

    #[test]
    fn merge_of_empty_list_is_empty_input() {
        assert_eq!(merge(&[]), RawInput::EMPTY);
    }

    #[test]
    fn merge_takes_last_non_stop_movement_and_ors_shoot() {
        let list = [
            raw(Movement::Right, false),
            raw(Movement::Up, false),
            raw(Movement::Stop, true),
        ];
        assert_eq!(merge(&list), raw(Movement::Up, true));
    }

    #[test]
    fn merge_ignores_appended_empty_inputs() {
        let list = [raw(Movement::Left, true)];
        let mut padded = list.to_vec();
        padded.push(RawInput::EMPTY);
        padded.push(RawInput::EMPTY);
        assert_eq!(merge(&padded), merge(&list));
    }

    #[test]
    fn merge_is_associative_over_concatenation() {
        let a = [raw(Movement::Right, false), raw(Movement::Down, true)];
        let b = [raw(Movement::Stop, false), raw(Movement::Left, false)];
        let whole: Vec<_> = a.iter().chain(b.iter()).copied().collect();

        // Folding the concatenation matches folding [merge(a)] ++ b.
        let mut staged = vec![merge(&a)];
        staged.extend_from_slice(&b);
        assert_eq!(merge(&whole), merge(&staged));
    }

    #[test]
    fn turn_inputs_default_to_empty_for_unknown_clients() {
        let mut inputs = TurnInputs::new();
        let mut row = TurnRow::new();
        row.insert("a".to_string(), vec![raw(Movement::Up, false)]);
        row.insert("b".to_string(), vec![]);
        inputs.install(&row);

        assert_eq!(inputs.get("a"), raw(Movement::Up, false));
        assert_eq!(inputs.get("b"), RawInput::EMPTY);
        assert_eq!(inputs.get("never-seen"), RawInput::EMPTY);

        inputs.clear();
        assert_eq!(inputs.get("a"), RawInput::EMPTY);
        assert!(inputs.is_clear());
    }
}
