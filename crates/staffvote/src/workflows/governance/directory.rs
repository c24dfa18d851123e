use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{Employee, EmployeeId, Position};

/// Error enumeration for employee registry access.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("employee not found")]
    NotFound,
    #[error("employee registry unavailable: {0}")]
    Unavailable(String),
}

/// Read boundary to the external employee registry. `update_position` is the
/// single write this crate performs, and only the resolution engine calls it.
pub trait EmployeeDirectory: Send + Sync {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, DirectoryError>;

    /// Active employees currently holding `position`.
    fn active_at_position(&self, position: Position) -> Result<Vec<Employee>, DirectoryError>;

    fn update_position(&self, id: &EmployeeId, position: Position) -> Result<(), DirectoryError>;
}

/// Registry double for tests, demos, and single-node deployments.
#[derive(Default, Clone)]
pub struct InMemoryEmployeeDirectory {
    employees: Arc<Mutex<HashMap<EmployeeId, Employee>>>,
}

impl InMemoryEmployeeDirectory {
    pub fn seeded(employees: impl IntoIterator<Item = Employee>) -> Self {
        let directory = Self::default();
        for employee in employees {
            directory.upsert(employee);
        }
        directory
    }

    pub fn upsert(&self, employee: Employee) {
        let mut guard = self.employees.lock().expect("directory mutex poisoned");
        guard.insert(employee.id.clone(), employee);
    }
}

impl EmployeeDirectory for InMemoryEmployeeDirectory {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, DirectoryError> {
        let guard = self.employees.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn active_at_position(&self, position: Position) -> Result<Vec<Employee>, DirectoryError> {
        let guard = self.employees.lock().expect("directory mutex poisoned");
        let mut matches: Vec<Employee> = guard
            .values()
            .filter(|employee| employee.position == position && employee.is_active())
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    fn update_position(&self, id: &EmployeeId, position: Position) -> Result<(), DirectoryError> {
        let mut guard = self.employees.lock().expect("directory mutex poisoned");
        let employee = guard.get_mut(id).ok_or(DirectoryError::NotFound)?;
        employee.position = position;
        Ok(())
    }
}
