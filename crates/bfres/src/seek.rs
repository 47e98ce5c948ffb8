//! Scoped repositioning of a loader or saver cursor.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::error::Result;

/// A cursor whose position can be queried and set
pub trait Positioned {
    /// The current absolute position.
    fn position(&mut self) -> Result<u64>;

    /// Move to an absolute position.
    fn set_position(&mut self, position: u64) -> Result<()>;

    /// Move to `position` until the returned guard is dropped.
    ///
    /// The guard dereferences to `self`, so nested loads and saves compose through it.
    fn temporary_seek(&mut self, position: u64) -> Result<TemporarySeek<'_, Self>>
    where
        Self: Sized,
    {
        let restore = self.position()?;
        self.set_position(position)?;
        Ok(TemporarySeek {
            inner: self,
            restore,
        })
    }
}

/// Restores the original cursor position when dropped, including on early returns and unwinding
pub struct TemporarySeek<'a, P: Positioned> {
    inner: &'a mut P,
    restore: u64,
}

impl<P: Positioned> Deref for TemporarySeek<'_, P> {
    type Target = P;

    fn deref(&self) -> &Self::Target {
        self.inner
    }
}

impl<P: Positioned> DerefMut for TemporarySeek<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner
    }
}

impl<P: Positioned> Drop for TemporarySeek<'_, P> {
    fn drop(&mut self) {
        if let Err(error) = self.inner.set_position(self.restore) {
            warn!(position = self.restore, %error, "unable to restore position");
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Seek, SeekFrom};

    use crate::error::{Error, Result};

    use super::Positioned;

    struct Probe(Cursor<Vec<u8>>);

    impl Positioned for Probe {
        fn position(&mut self) -> Result<u64> {
            Ok(self.0.stream_position()?)
        }

        fn set_position(&mut self, position: u64) -> Result<()> {
            self.0.seek(SeekFrom::Start(position))?;
            Ok(())
        }
    }

    #[test]
    fn restores_after_nested_seeks() -> Result<()> {
        let mut probe = Probe(Cursor::new(vec![0; 32]));
        probe.set_position(4)?;
        {
            let mut outer = probe.temporary_seek(16)?;
            assert_eq!(outer.position()?, 16);
            {
                let mut inner = outer.temporary_seek(24)?;
                assert_eq!(inner.position()?, 24);
            }
            assert_eq!(outer.position()?, 16);
        }
        assert_eq!(probe.position()?, 4);
        Ok(())
    }

    #[test]
    fn restores_when_the_callback_fails() -> Result<()> {
        fn failing(probe: &mut Probe) -> Result<()> {
            let _guard = probe.temporary_seek(20)?;
            Err(Error::CustomError("boom".into()))
        }

        let mut probe = Probe(Cursor::new(vec![0; 32]));
        probe.set_position(8)?;
        assert!(failing(&mut probe).is_err());
        assert_eq!(probe.position()?, 8);
        Ok(())
    }
}
