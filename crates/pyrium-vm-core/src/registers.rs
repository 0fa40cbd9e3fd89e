//! Variable registers
//!
//! Three independent namespaces keyed by name. A register set belongs to
//! exactly one VM and survives across ticks.

use rustc_hash::FxHashMap;

/// Integer, float and string registers of one VM
#[derive(Debug, Clone, Default)]
pub struct Registers {
    ints: FxHashMap<String, i64>,
    floats: FxHashMap<String, f64>,
    strings: FxHashMap<String, String>,
}

impl Registers {
    /// Create an empty register set
    pub fn new() -> Self {
        Self::default()
    }

    /// Integer register, if written
    #[inline]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.ints.get(name).copied()
    }

    /// Write an integer register
    pub fn set_int(&mut self, name: &str, value: i64) {
        if let Some(slot) = self.ints.get_mut(name) {
            *slot = value;
        } else {
            self.ints.insert(name.to_owned(), value);
        }
    }

    /// Float register, if written
    #[inline]
    pub fn float(&self, name: &str) -> Option<f64> {
        self.floats.get(name).copied()
    }

    /// Write a float register
    pub fn set_float(&mut self, name: &str, value: f64) {
        self.floats.insert(name.to_owned(), value);
    }

    /// String register, if written
    #[inline]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    /// Write a string register
    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.strings.insert(name.to_owned(), value.into());
    }

    /// Iterate integer registers (unordered)
    pub fn ints(&self) -> impl Iterator<Item = (&str, i64)> {
        self.ints.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Total number of registers across all namespaces
    pub fn len(&self) -> usize {
        self.ints.len() + self.floats.len() + self.strings.len()
    }

    /// Whether no register has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every register
    pub fn clear(&mut self) {
        self.ints.clear();
        self.floats.clear();
        self.strings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_independent() {
        let mut regs = Registers::new();
        regs.set_int("x", 1);
        regs.set_float("x", 2.5);
        regs.set_string("x", "three");

        assert_eq!(regs.int("x"), Some(1));
        assert_eq!(regs.float("x"), Some(2.5));
        assert_eq!(regs.string("x"), Some("three"));
        assert_eq!(regs.len(), 3);

        regs.clear();
        assert!(regs.is_empty());
        assert_eq!(regs.int("x"), None);
    }
}
