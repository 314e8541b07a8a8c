use super::formal_arg::FormalArgument;
use crate::error::ModelError;

/// Whether `set_name` may rename a system element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemRenamePolicy {
    Allow,
    #[default]
    Refuse,
}

/// State shared by predicate and matrix elements.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabCore {
    name: String,
    var_len: bool,
    system: bool,
    args: Vec<FormalArgument>,
}

pub(crate) fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::InvalidName {
            name: name.to_owned(),
            reason: "names must not be empty",
        });
    }
    Ok(())
}

impl VocabCore {
    /// Rewrite `pred{...}` constraints after `old` was renamed to `new`.
    /// Applies to system elements too: the constraint follows the name.
    pub(crate) fn rename_permitted_pred(&mut self, old: &str, new: &str) {
        for arg in &mut self.args {
            arg.rename_permitted_pred(old, new);
        }
    }

    fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(VocabCore {
            name,
            var_len: false,
            system: false,
            args: Vec::new(),
        })
    }
}

/// Ordered, uniquely named formal-argument list behaviour.
///
/// Every list mutator fails once the element is a system element, and
/// every failure leaves the list as it was.
pub trait FormalArgs {
    fn core(&self) -> &VocabCore;
    fn core_mut(&mut self) -> &mut VocabCore;

    /// Whether this kind of element may take a trailing variable-length
    /// argument.
    fn allows_var_len(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn var_len(&self) -> bool {
        self.core().var_len
    }

    fn is_system(&self) -> bool {
        self.core().system
    }

    fn formal_args(&self) -> &[FormalArgument] {
        &self.core().args
    }

    fn num_formal_args(&self) -> usize {
        self.core().args.len()
    }

    fn has_formal_arg(&self, name: &str) -> bool {
        self.core().args.iter().any(|a| a.name() == name)
    }

    /// `Ok(None)` at `index == len`, an error past it.
    fn get_formal_arg(&self, index: usize) -> Result<Option<&FormalArgument>, ModelError> {
        let args = &self.core().args;
        if index > args.len() {
            return Err(ModelError::IndexOutOfRange {
                index,
                len: args.len(),
            });
        }
        Ok(args.get(index))
    }

    fn append_formal_arg(&mut self, arg: FormalArgument) -> Result<(), ModelError> {
        let len = self.num_formal_args();
        self.insert_formal_arg(arg, len)
    }

    fn insert_formal_arg(&mut self, arg: FormalArgument, index: usize) -> Result<(), ModelError> {
        ensure_not_system(self.core(), "insert formal arguments")?;
        let len = self.num_formal_args();
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        if self.has_formal_arg(arg.name()) {
            return Err(ModelError::DuplicateFormalArg {
                vocab: self.name().to_owned(),
                arg: arg.name().to_owned(),
            });
        }
        self.core_mut().args.insert(index, arg);
        Ok(())
    }

    fn delete_formal_arg(&mut self, index: usize) -> Result<FormalArgument, ModelError> {
        ensure_not_system(self.core(), "delete formal arguments")?;
        let len = self.num_formal_args();
        if index >= len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        Ok(self.core_mut().args.remove(index))
    }

    /// Delete then insert at `index`. Returns the replaced argument.
    fn replace_formal_arg(
        &mut self,
        arg: FormalArgument,
        index: usize,
    ) -> Result<FormalArgument, ModelError> {
        let old = self.delete_formal_arg(index)?;
        match self.insert_formal_arg(arg, index) {
            Ok(()) => Ok(old),
            Err(e) => {
                self.core_mut().args.insert(index, old);
                Err(e)
            }
        }
    }

    fn set_name(&mut self, name: &str, policy: SystemRenamePolicy) -> Result<(), ModelError> {
        validate_name(name)?;
        if self.is_system() && policy == SystemRenamePolicy::Refuse {
            return Err(ModelError::SystemProtected {
                vocab: self.name().to_owned(),
                op: "rename",
            });
        }
        self.core_mut().name = name.to_owned();
        Ok(())
    }

    fn set_var_len(&mut self, var_len: bool) -> Result<(), ModelError> {
        ensure_not_system(self.core(), "change the variable-length flag")?;
        if var_len && !self.allows_var_len() {
            return Err(ModelError::MatrixVarLen {
                vocab: self.name().to_owned(),
            });
        }
        self.core_mut().var_len = var_len;
        Ok(())
    }

    /// Mark the element as a protected system element.
    fn set_system(&mut self) -> Result<(), ModelError> {
        if self.core().args.is_empty() {
            return Err(ModelError::EmptyArgList {
                vocab: self.name().to_owned(),
            });
        }
        self.core_mut().system = true;
        Ok(())
    }
}

fn ensure_not_system(core: &VocabCore, op: &'static str) -> Result<(), ModelError> {
    if core.system {
        return Err(ModelError::SystemProtected {
            vocab: core.name.clone(),
            op,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateVocab {
    core: VocabCore,
}

impl PredicateVocab {
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        Ok(PredicateVocab {
            core: VocabCore::new(name)?,
        })
    }
}

impl FormalArgs for PredicateVocab {
    fn core(&self) -> &VocabCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut VocabCore {
        &mut self.core
    }
}

/// Shape of a matrix column's cells. Matrix shapes are fixed-length.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixVocab {
    core: VocabCore,
}

impl MatrixVocab {
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        Ok(MatrixVocab {
            core: VocabCore::new(name)?,
        })
    }
}

impl FormalArgs for MatrixVocab {
    fn core(&self) -> &VocabCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut VocabCore {
        &mut self.core
    }

    fn allows_var_len(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VocabElement {
    Predicate(PredicateVocab),
    Matrix(MatrixVocab),
}

impl VocabElement {
    pub fn predicate(name: impl Into<String>) -> Result<Self, ModelError> {
        PredicateVocab::new(name).map(VocabElement::Predicate)
    }

    pub fn matrix(name: impl Into<String>) -> Result<Self, ModelError> {
        MatrixVocab::new(name).map(VocabElement::Matrix)
    }

    pub fn is_predicate(&self) -> bool {
        matches!(self, VocabElement::Predicate(_))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, VocabElement::Matrix(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            VocabElement::Predicate(_) => "predicate",
            VocabElement::Matrix(_) => "matrix",
        }
    }
}

impl FormalArgs for VocabElement {
    fn core(&self) -> &VocabCore {
        match self {
            VocabElement::Predicate(p) => p.core(),
            VocabElement::Matrix(m) => m.core(),
        }
    }

    fn core_mut(&mut self) -> &mut VocabCore {
        match self {
            VocabElement::Predicate(p) => p.core_mut(),
            VocabElement::Matrix(m) => m.core_mut(),
        }
    }

    fn allows_var_len(&self) -> bool {
        match self {
            VocabElement::Predicate(p) => p.allows_var_len(),
            VocabElement::Matrix(m) => m.allows_var_len(),
        }
    }
}
