use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::hash::BuildHasher;
use std::ops::Deref;

use thread_local::ThreadLocal;
use tracing::{debug, error};

use super::cursor::Cursor;
use super::size::tag_len;
use crate::{EncodeError, MetricResult, MetricsError};

/// Default capacity of the per-thread scratch buffer, a safe single UDP datagram body.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 512;

/// A collection of tags: unique keys, each with an optional value.
///
/// Tags are rendered in the order `try_for_each_tag` visits them; the
/// formatter never sorts or deduplicates. `tag_count` must match the number
/// of visited tags.
pub trait TagSet {
    /// Number of tags visited by [`TagSet::try_for_each_tag`].
    fn tag_count(&self) -> usize;

    /// Visits every tag in order, stopping at the first error.
    ///
    /// # Errors
    /// Returns the first error produced by `f`.
    fn try_for_each_tag<E, F>(&self, f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>;
}

impl<K, V> TagSet for [(K, Option<V>)]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn tag_count(&self) -> usize {
        self.len()
    }

    fn try_for_each_tag<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>,
    {
        self.iter()
            .try_for_each(|(key, value)| f(key.as_ref(), value.as_ref().map(|v| v.as_ref())))
    }
}

impl<K, V, const N: usize> TagSet for [(K, Option<V>); N]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn tag_count(&self) -> usize {
        N
    }

    fn try_for_each_tag<E, F>(&self, f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>,
    {
        self.as_slice().try_for_each_tag(f)
    }
}

impl<K, V> TagSet for Vec<(K, Option<V>)>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn tag_count(&self) -> usize {
        self.len()
    }

    fn try_for_each_tag<E, F>(&self, f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>,
    {
        self.as_slice().try_for_each_tag(f)
    }
}

impl<K, V, S> TagSet for HashMap<K, Option<V>, S>
where
    K: AsRef<str>,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn tag_count(&self) -> usize {
        self.len()
    }

    fn try_for_each_tag<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>,
    {
        self.iter()
            .try_for_each(|(key, value)| f(key.as_ref(), value.as_ref().map(|v| v.as_ref())))
    }
}

impl<K, V> TagSet for BTreeMap<K, Option<V>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn tag_count(&self) -> usize {
        self.len()
    }

    fn try_for_each_tag<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>,
    {
        self.iter()
            .try_for_each(|(key, value)| f(key.as_ref(), value.as_ref().map(|v| v.as_ref())))
    }
}

impl<T: TagSet + ?Sized> TagSet for &T {
    fn tag_count(&self) -> usize {
        (**self).tag_count()
    }

    fn try_for_each_tag<E, F>(&self, f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>,
    {
        (**self).try_for_each_tag(f)
    }
}

/// An absent tag set renders like an empty one.
impl<T: TagSet> TagSet for Option<T> {
    fn tag_count(&self) -> usize {
        self.as_ref().map_or(0, TagSet::tag_count)
    }

    fn try_for_each_tag<E, F>(&self, f: F) -> Result<(), E>
    where
        F: FnMut(&str, Option<&str>) -> Result<(), E>,
    {
        match self {
            Some(tags) => tags.try_for_each_tag(f),
            None => Ok(()),
        }
    }
}

/// Where the assembled metric line places the tag block.
///
/// The formatter output is the same either way; only line assembly changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagPlacement {
    /// After the metric type, as in `name:1|c|#env:prod`.
    #[default]
    Trailing,
    /// Directly after the metric name, as in `name,env=prod:1|c`.
    AfterName,
}

/// Configuration for a [`TagFormatter`], fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFormatOptions {
    /// Written once before the first tag.
    pub prefix: String,
    /// Written once after the last tag.
    pub suffix: String,
    /// Written between consecutive tags.
    pub tag_separator: String,
    /// Written between a key and its value when the value is present.
    pub key_value_separator: String,
    /// How the metric line positions the tag block.
    pub placement: TagPlacement,
    /// Initial size of each thread's scratch buffer. Must be greater than 0.
    pub scratch_capacity: usize,
}

impl TagFormatOptions {
    /// `DogStatsD` layout: `|#key:value,key2`.
    #[must_use]
    pub fn dogstatsd() -> Self {
        Self {
            prefix: "|#".to_string(),
            suffix: String::new(),
            tag_separator: ",".to_string(),
            key_value_separator: ":".to_string(),
            placement: TagPlacement::Trailing,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
        }
    }

    /// Telegraf/InfluxDB statsd layout: `,key=value,key2` right after the metric name.
    #[must_use]
    pub fn influx() -> Self {
        Self {
            prefix: ",".to_string(),
            suffix: String::new(),
            tag_separator: ",".to_string(),
            key_value_separator: "=".to_string(),
            placement: TagPlacement::AfterName,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
        }
    }
}

impl Default for TagFormatOptions {
    fn default() -> Self {
        Self::dogstatsd()
    }
}

/// Renders tag sets into a single text block.
///
/// Each thread formatting through the same `TagFormatter` gets its own
/// scratch buffer, so `format` takes no locks. The buffer starts at
/// [`TagFormatOptions::scratch_capacity`] bytes and is replaced by an
/// exactly sized one whenever a tag set does not fit.
///
/// ```
/// use rylv_statsd_encoding::{TagFormatOptions, TagFormatter};
///
/// let formatter = TagFormatter::new(TagFormatOptions::dogstatsd()).unwrap();
/// let tags = [("env", Some("prod")), ("canary", None)];
/// assert_eq!(formatter.required_size(&tags), 17);
/// assert_eq!(formatter.format(&tags).unwrap().as_str(), "|#env:prod,canary");
/// ```
pub struct TagFormatter {
    options: TagFormatOptions,
    scratch: ThreadLocal<RefCell<Box<[u8]>>>,
}

impl std::fmt::Debug for TagFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagFormatter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TagFormatter {
    /// Creates a formatter.
    ///
    /// # Errors
    /// Returns [`MetricsError`] if `options.scratch_capacity` is 0.
    pub fn new(options: TagFormatOptions) -> MetricResult<Self> {
        if options.scratch_capacity == 0 {
            return Err(MetricsError::from(
                "Invalid scratch capacity: must be greater than 0",
            ));
        }
        Ok(Self {
            options,
            scratch: ThreadLocal::new(),
        })
    }

    /// The configuration this formatter was built with.
    #[must_use]
    pub const fn options(&self) -> &TagFormatOptions {
        &self.options
    }

    /// The tag placement the metric line should use.
    #[must_use]
    pub const fn placement(&self) -> TagPlacement {
        self.options.placement
    }

    /// Capacity of the calling thread's scratch buffer.
    #[must_use]
    pub fn scratch_capacity(&self) -> usize {
        self.scratch
            .get()
            .and_then(|cell| cell.try_borrow().ok().map(|scratch| scratch.len()))
            .unwrap_or(self.options.scratch_capacity)
    }

    /// Exact number of bytes [`TagFormatter::format`] produces for `tags`.
    ///
    /// Returns 0 for an empty or absent tag set.
    pub fn required_size<T: TagSet + ?Sized>(&self, tags: &T) -> usize {
        let count = tags.tag_count();
        if count == 0 {
            return 0;
        }

        let options = &self.options;
        let key_value_separator_len = options.key_value_separator.len();
        let mut size = options.prefix.len()
            + (count - 1) * options.tag_separator.len()
            + options.suffix.len();
        let Ok(()) = tags.try_for_each_tag(|key, value| {
            size += tag_len(key, value, key_value_separator_len);
            Ok::<(), Infallible>(())
        });
        size
    }

    /// Renders `tags` into the calling thread's scratch buffer.
    ///
    /// The returned view borrows the scratch buffer; drop it before the next
    /// `format` call on the same thread.
    ///
    /// # Errors
    /// Returns [`MetricsError::ScratchBusy`] if a previous result from this
    /// thread is still alive. [`MetricsError::SizingOverflow`] and
    /// [`MetricsError::SizingContract`] report an exactly sized retry that
    /// overflowed or finished short of the measured length.
    pub fn format<T: TagSet + ?Sized>(&self, tags: &T) -> MetricResult<FormattedTags<'_>> {
        if tags.tag_count() == 0 {
            return Ok(FormattedTags { bytes: None });
        }

        let cell = self.scratch.get_or(|| {
            RefCell::new(vec![0u8; self.options.scratch_capacity].into_boxed_slice())
        });
        let mut scratch = cell
            .try_borrow_mut()
            .map_err(|_| MetricsError::ScratchBusy)?;

        let mut cursor = Cursor::new(&mut scratch);
        let fast_path = self.render(tags, &mut cursor);
        let written = match fast_path {
            Ok(()) => cursor.written(),
            Err(_) => self.render_exact(tags, &mut scratch)?,
        };

        Ok(FormattedTags {
            bytes: Some(RefMut::map(scratch, |scratch| &mut scratch[..written])),
        })
    }

    // Replaces the scratch buffer with one of exactly the required size and renders again.
    fn render_exact<T: TagSet + ?Sized>(
        &self,
        tags: &T,
        scratch: &mut Box<[u8]>,
    ) -> MetricResult<usize> {
        let required = self.required_size(tags);
        debug!(
            required,
            capacity = scratch.len(),
            "Replacing tag scratch buffer"
        );
        *scratch = vec![0u8; required].into_boxed_slice();

        let mut cursor = Cursor::new(scratch);
        if let Err(source) = self.render(tags, &mut cursor) {
            error!(
                expected = required,
                written = cursor.written(),
                "Tag block overflowed its computed size: {source}"
            );
            return Err(MetricsError::SizingOverflow {
                expected: required,
                source,
            });
        }
        let written = cursor.written();
        if written != required {
            error!(
                expected = required,
                written, "Tag block does not match its computed size"
            );
            return Err(MetricsError::SizingContract {
                expected: required,
                written,
            });
        }
        Ok(written)
    }

    fn render<T: TagSet + ?Sized>(
        &self,
        tags: &T,
        cursor: &mut Cursor<'_>,
    ) -> Result<(), EncodeError> {
        let options = &self.options;
        let last = tags.tag_count().saturating_sub(1);

        cursor.write_str(&options.prefix)?;
        let mut index = 0;
        tags.try_for_each_tag(|key, value| -> Result<(), EncodeError> {
            cursor.write_str(key)?;
            if let Some(value) = value {
                cursor.write_str(&options.key_value_separator)?;
                cursor.write_str(value)?;
            }
            if index != last {
                cursor.write_str(&options.tag_separator)?;
            }
            index += 1;
            Ok(())
        })?;
        cursor.write_str(&options.suffix)
    }
}

/// A rendered tag block borrowed from the formatting thread's scratch buffer.
pub struct FormattedTags<'a> {
    bytes: Option<RefMut<'a, [u8]>>,
}

impl FormattedTags<'_> {
    /// The rendered bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or_default()
    }

    /// The rendered text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // SAFETY: the block is a concatenation of whole `&str` values
        unsafe { std::str::from_utf8_unchecked(self.as_bytes()) }
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// True when the tag set was empty or absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl Deref for FormattedTags<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for FormattedTags<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for FormattedTags<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FormattedTags").field(&self.as_str()).finish()
    }
}
