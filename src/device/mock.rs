// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;

use super::DeviceError;
use crate::matrix::Rgb;

/// A mock display device. Records everything committed to it so tests (and
/// dry runs with a `mock` driver configured) can observe engine output.
pub struct Device {
    name: String,
    /// The last committed frame.
    committed: Mutex<Vec<Rgb>>,
    /// The number of successful commits.
    commits: AtomicUsize,
    /// The number of upcoming commits that should fail.
    fail_commits: AtomicUsize,
    /// The number of times the display was cleared.
    clears: AtomicUsize,
}

impl Device {
    /// Gets the mock device with the given name.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            committed: Mutex::new(Vec::new()),
            commits: AtomicUsize::new(0),
            fail_commits: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    /// Makes the next `count` commits fail with a transient error.
    pub fn fail_next_commits(&self, count: usize) {
        self.fail_commits.store(count, Ordering::SeqCst);
    }

    /// The last frame that was successfully committed.
    pub fn last_committed(&self) -> Vec<Rgb> {
        self.committed.lock().clone()
    }

    /// The number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// The number of times the display was cleared.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl super::Device for Device {
    fn commit(&self, pixels: &[Rgb]) -> Result<(), DeviceError> {
        if self
            .fail_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
        {
            return Err(DeviceError::Driver("injected commit failure".to_string()));
        }

        *self.committed.lock() = pixels.to_vec();
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), DeviceError> {
        let mut committed = self.committed.lock();
        committed.fill(Rgb::BLACK);
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (mock)", self.name)
    }
}

#[cfg(test)]
mod test {
    use super::super::Device as _;
    use super::*;

    #[test]
    fn test_mock_records_commits() {
        let device = Device::get("mock-device");
        let frame = vec![Rgb::new(1, 2, 3); 4];

        device.commit(&frame).unwrap();
        assert_eq!(device.last_committed(), frame);
        assert_eq!(device.commit_count(), 1);
    }

    #[test]
    fn test_mock_injected_failures() {
        let device = Device::get("mock-device");
        device.fail_next_commits(2);

        let frame = vec![Rgb::BLACK; 4];
        assert!(device.commit(&frame).is_err());
        assert!(device.commit(&frame).is_err());
        assert!(device.commit(&frame).is_ok());
        assert_eq!(device.commit_count(), 1);
    }
}
