use crate::engine::candidate::CandidateNode;
use std::collections::HashMap;
use std::rc::Rc;

/// Ordered candidates flowing between operators, plus the auto-create policy
/// and variable bindings in scope.
#[derive(Debug, Clone)]
pub struct Context {
    pub matches: Vec<CandidateNode>,
    auto_create: bool,
    variables: Rc<HashMap<String, Vec<CandidateNode>>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Context {
    pub fn new(matches: Vec<CandidateNode>) -> Self {
        Self { matches, auto_create: true, variables: Rc::new(HashMap::new()) }
    }

    #[must_use]
    pub fn with_auto_create(mut self, enabled: bool) -> Self {
        self.auto_create = enabled;
        self
    }

    pub fn auto_create(&self) -> bool {
        self.auto_create
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateNode> {
        self.matches.iter()
    }

    pub fn first(&self) -> Option<&CandidateNode> {
        self.matches.first()
    }

    pub fn into_matches(self) -> Vec<CandidateNode> {
        self.matches
    }

    /// Same policy and bindings, new matches.
    pub fn child_context(&self, matches: Vec<CandidateNode>) -> Self {
        Self { matches, auto_create: self.auto_create, variables: Rc::clone(&self.variables) }
    }

    pub fn single_child_context(&self, candidate: CandidateNode) -> Self {
        self.child_context(vec![candidate])
    }

    #[must_use]
    pub fn read_only_clone(&self) -> Self {
        let mut ctx = self.clone();
        ctx.auto_create = false;
        ctx
    }

    #[must_use]
    pub fn writable_clone(&self) -> Self {
        let mut ctx = self.clone();
        ctx.auto_create = true;
        ctx
    }

    pub fn single_read_only_child_context(&self, candidate: CandidateNode) -> Self {
        let mut ctx = self.single_child_context(candidate);
        ctx.auto_create = false;
        ctx
    }

    /// Bind `name`, shadowing any outer binding.
    #[must_use]
    pub fn with_variable(&self, name: &str, value: Vec<CandidateNode>) -> Self {
        let mut variables = (*self.variables).clone();
        variables.insert(name.to_string(), value);
        Self { matches: self.matches.clone(), auto_create: self.auto_create, variables: Rc::new(variables) }
    }

    pub fn variable(&self, name: &str) -> Option<&[CandidateNode]> {
        self.variables.get(name).map(Vec::as_slice)
    }
}

impl IntoIterator for Context {
    type Item = CandidateNode;
    type IntoIter = std::vec::IntoIter<CandidateNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<'a> IntoIterator for &'a Context {
    type Item = &'a CandidateNode;
    type IntoIter = std::slice::Iter<'a, CandidateNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}
