//! Reordering of method arguments into the order the query consumes them

use crate::core::field::FieldValue;
use crate::query::method::QueryMethod;
use crate::query::tree::PartTree;

/// Permutation from declared value-argument order to part order.
///
/// `permutation[i]` is the index of the declared value argument bound at
/// query position `i`. Computed once per method from its static shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRearrangement {
    permutation: Vec<usize>,
    required: bool,
}

impl ParameterRearrangement {
    pub fn identity(len: usize) -> Self {
        Self {
            permutation: (0..len).collect(),
            required: false,
        }
    }

    /// Match named value parameters against the properties of the parts.
    ///
    /// Each query position takes the first unused parameter whose name
    /// matches its property. Positions without a match take the remaining
    /// parameters in declaration order.
    pub fn compute(method: &QueryMethod, tree: &PartTree) -> Self {
        let names: Vec<Option<String>> = method
            .value_parameters()
            .map(|p| p.name.as_deref().map(normalize))
            .collect();
        let expected: Vec<String> = tree
            .parts()
            .flat_map(|part| std::iter::repeat_n(normalize(part.segment()), part.number_of_arguments()))
            .collect();

        if expected.len() != names.len() {
            return Self::identity(names.len());
        }

        let mut used = vec![false; names.len()];
        let mut slots: Vec<Option<usize>> = vec![None; expected.len()];
        for (position, property) in expected.iter().enumerate() {
            let matched = names
                .iter()
                .enumerate()
                .find(|(index, name)| !used[*index] && name.as_deref() == Some(property.as_str()))
                .map(|(index, _)| index);
            if let Some(index) = matched {
                used[index] = true;
                slots[position] = Some(index);
            }
        }

        let mut unused = (0..names.len()).filter(|index| !used[*index]);
        let permutation: Vec<usize> = slots
            .into_iter()
            .map(|slot| slot.or_else(|| unused.next()).unwrap_or_default())
            .collect();

        let required = permutation.iter().enumerate().any(|(i, p)| i != *p);
        Self {
            permutation,
            required,
        }
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Whether the arguments need reordering at all
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Apply the permutation to declared-order values
    pub fn rearrange(&self, values: Vec<FieldValue>) -> Vec<FieldValue> {
        if !self.required || values.len() != self.permutation.len() {
            return values;
        }
        let mut slots: Vec<Option<FieldValue>> = values.into_iter().map(Some).collect();
        self.permutation
            .iter()
            .filter_map(|index| slots[*index].take())
            .collect()
    }
}

/// `lastName`, `last_name` and `LastName` all bind to the same property
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
