use crate::nav::flatten::FlatChoice;
use std::collections::HashSet;

/// Headline categories whose choices stay visible above the collapsed group.
#[derive(Debug, Clone, Default)]
pub struct FeaturedSet {
    names: HashSet<String>,
}

impl FeaturedSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, choice: &FlatChoice) -> bool {
        choice
            .labels
            .first()
            .map(|first| self.names.contains(first))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub featured: Vec<FlatChoice>,
    pub hidden: Vec<FlatChoice>,
}

pub fn sort_key(choice: &FlatChoice) -> String {
    choice.labels.concat()
}

pub fn partition(mut choices: Vec<FlatChoice>, featured: &FeaturedSet) -> Partition {
    // sort_by_key is stable: equal keys keep flatten order
    choices.sort_by_key(sort_key);
    let (featured, hidden) = choices.into_iter().partition(|c| featured.contains(c));
    Partition { featured, hidden }
}
