//! Argument collections: inputs, results and partial results by identifier
//!
//! An algorithm declares one closed identifier enumeration per role with
//! [`argument_ids!`](crate::argument_ids). A collection holds one optional
//! [`Argument`] slot per identifier; typed access narrows the slot at run time
//! and reports a typed error when the stored object is missing or of the
//! wrong kind.

use crate::error::{Error, ErrorKind, ErrorRecord, Result, Status};
use crate::table::{NumericTable, TableFlags, TableRef, TableSnapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Closed enumeration of argument slots
pub trait ArgumentId: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    const COUNT: usize;

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    /// Stable name used in error records and snapshots
    fn name(self) -> &'static str;
}

/// Declare an argument identifier enumeration
///
/// ```
/// use numtab_core::argument_ids;
/// use numtab_core::arguments::ArgumentId;
///
/// argument_ids! {
///     pub enum InputId {
///         X => "x",
///         Y => "y",
///     }
/// }
///
/// assert_eq!(InputId::COUNT, 2);
/// assert_eq!(InputId::from_index(1), Some(InputId::Y));
/// assert_eq!(InputId::X.name(), "x");
/// ```
#[macro_export]
macro_rules! argument_ids {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl $crate::arguments::ArgumentId for $name {
            const COUNT: usize = $name::ALL.len();

            fn index(self) -> usize {
                self as usize
            }

            fn from_index(index: usize) -> Option<Self> {
                $name::ALL.get(index).copied()
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

/// Polymorphic value stored in a slot
#[derive(Clone)]
pub enum Argument<'a> {
    Table(TableRef<'a>),
    /// Arbitrary shared object, e.g. a trained sub-model
    Object(Arc<dyn Any + Send + Sync>),
    Collection(Vec<Argument<'a>>),
}

impl Argument<'_> {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Object(_) => "object",
            Self::Collection(_) => "collection",
        }
    }
}

impl fmt::Debug for Argument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => f
                .debug_struct("Table")
                .field("rows", &table.rows())
                .field("columns", &table.columns())
                .field("layout", &table.layout())
                .finish(),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::Collection(items) => f.debug_list().entries(items).finish(),
        }
    }
}

/// What a collection holds; decides the error for a missing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentRole {
    Input,
    Result,
    PartialResult,
}

impl ArgumentRole {
    pub fn missing_kind(self) -> ErrorKind {
        match self {
            Self::Input => ErrorKind::NullInputNumericTable,
            Self::Result => ErrorKind::NullResult,
            Self::PartialResult => ErrorKind::NullPartialResult,
        }
    }
}

/// Fixed-size map from identifiers of `I` to arguments
#[derive(Clone)]
pub struct ArgumentCollection<'a, I: ArgumentId> {
    role: ArgumentRole,
    slots: Vec<Option<Argument<'a>>>,
    _ids: PhantomData<I>,
}

impl<'a, I: ArgumentId> ArgumentCollection<'a, I> {
    /// Empty collection with one slot per identifier
    pub fn new(role: ArgumentRole) -> Self {
        Self {
            role,
            slots: vec![None; I::COUNT],
            _ids: PhantomData,
        }
    }

    pub fn role(&self) -> ArgumentRole {
        self.role
    }

    fn missing(&self, id: I) -> Error {
        Error::with_argument(self.role.missing_kind(), id.name())
    }

    pub fn set(&mut self, id: I, argument: Argument<'a>) {
        self.slots[id.index()] = Some(argument);
    }

    pub fn set_table(&mut self, id: I, table: TableRef<'a>) {
        self.set(id, Argument::Table(table));
    }

    pub fn set_object<O: Any + Send + Sync>(&mut self, id: I, object: Arc<O>) {
        self.set(id, Argument::Object(object));
    }

    pub fn clear(&mut self, id: I) {
        self.slots[id.index()] = None;
    }

    pub fn take(&mut self, id: I) -> Option<Argument<'a>> {
        self.slots[id.index()].take()
    }

    pub fn get(&self, id: I) -> Option<&Argument<'a>> {
        self.slots[id.index()].as_ref()
    }

    pub fn is_set(&self, id: I) -> bool {
        self.slots[id.index()].is_some()
    }

    /// Populated slots in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (I, &Argument<'a>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((I::from_index(i)?, slot.as_ref()?)))
    }

    pub fn table(&self, id: I) -> Result<&TableRef<'a>> {
        match self.get(id) {
            Some(Argument::Table(table)) => Ok(table),
            Some(other) => Err(Error::incorrect_type(id.name(), other.kind_name())),
            None => Err(self.missing(id)),
        }
    }

    /// Exclusive access to a table this collection holds the only handle to
    pub fn table_mut(&mut self, id: I) -> Result<&mut (dyn NumericTable + 'a)> {
        let role = self.role;
        match self.slots[id.index()].as_mut() {
            Some(Argument::Table(table)) => Arc::get_mut(table).ok_or_else(|| {
                Error::with_detail(
                    ErrorKind::ReadOnlyNumericTable,
                    id.name(),
                    "table handle is shared",
                )
            }),
            Some(other) => Err(Error::incorrect_type(id.name(), other.kind_name())),
            None => Err(Error::with_argument(role.missing_kind(), id.name())),
        }
    }

    pub fn object<O: Any + Send + Sync>(&self, id: I) -> Result<&O> {
        match self.get(id) {
            Some(Argument::Object(object)) => object
                .downcast_ref::<O>()
                .ok_or_else(|| Error::incorrect_type(id.name(), std::any::type_name::<O>())),
            Some(other) => Err(Error::incorrect_type(id.name(), other.kind_name())),
            None => Err(self.missing(id)),
        }
    }

    pub fn collection(&self, id: I) -> Result<&[Argument<'a>]> {
        match self.get(id) {
            Some(Argument::Collection(items)) => Ok(items),
            Some(other) => Err(Error::incorrect_type(id.name(), other.kind_name())),
            None => Err(self.missing(id)),
        }
    }

    /// Set by raw slot index, checked against the enumeration
    pub fn set_by_index(&mut self, index: usize, argument: Argument<'a>) -> Result<()> {
        let id = Self::id_at(index)?;
        self.set(id, argument);
        Ok(())
    }

    pub fn get_by_index(&self, index: usize) -> Result<Option<&Argument<'a>>> {
        Ok(self.get(Self::id_at(index)?))
    }

    fn id_at(index: usize) -> Result<I> {
        I::from_index(index).ok_or_else(|| {
            Error::with_detail(
                ErrorKind::UndefinedArgumentId,
                "index",
                format!("index {index} outside 0..{}", I::COUNT),
            )
        })
    }

    /// Presence and shape check for a table slot, for `check()` passes
    pub fn check_table(
        &self,
        id: I,
        expected_rows: Option<usize>,
        expected_columns: Option<usize>,
    ) -> Status {
        match self.table(id) {
            Ok(table) => check_table(table.as_ref(), id.name(), expected_rows, expected_columns),
            Err(err) => err.into(),
        }
    }

    /// Serializable copy of every table slot
    pub fn snapshot(&self) -> Result<CollectionSnapshot> {
        let mut entries = Vec::new();
        for (id, argument) in self.iter() {
            match argument {
                Argument::Table(table) => {
                    entries.push((id.name().to_string(), TableSnapshot::capture(table.as_ref())?))
                }
                other => {
                    return Err(Error::with_detail(
                        ErrorKind::IncorrectTypeOfInput,
                        id.name(),
                        format!("{} arguments cannot be serialized", other.kind_name()),
                    ))
                }
            }
        }
        Ok(CollectionSnapshot {
            role: self.role,
            entries,
        })
    }
}

impl<I: ArgumentId> fmt::Debug for ArgumentCollection<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentCollection")
            .field("role", &self.role)
            .field("arguments", &self.iter().map(|(id, a)| (id.name(), a)).collect::<Vec<_>>())
            .finish()
    }
}

/// Allocation and shape validation of one table
pub fn check_table<N: NumericTable + ?Sized>(
    table: &N,
    name: &str,
    expected_rows: Option<usize>,
    expected_columns: Option<usize>,
) -> Status {
    if !table.flags().contains(TableFlags::ALLOCATED) {
        return ErrorRecord::new(ErrorKind::NullNumericTable)
            .with_argument(name)
            .into();
    }
    let mut status = Status::ok();
    if let Some(rows) = expected_rows {
        status |= Status::ensure(table.rows() == rows, || {
            ErrorRecord::new(ErrorKind::IncorrectNumberOfRows)
                .with_argument(name)
                .with_detail(format!("expected {rows} rows, got {}", table.rows()))
        });
    }
    if let Some(columns) = expected_columns {
        status |= Status::ensure(table.columns() == columns, || {
            ErrorRecord::new(ErrorKind::IncorrectNumberOfColumns)
                .with_argument(name)
                .with_detail(format!("expected {columns} columns, got {}", table.columns()))
        });
    }
    status
}

/// Transferable form of a table-only collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub role: ArgumentRole,
    pub entries: Vec<(String, TableSnapshot)>,
}

impl CollectionSnapshot {
    /// Rebuild an owned collection; entry names must belong to `I`
    pub fn restore<I: ArgumentId>(&self) -> Result<ArgumentCollection<'static, I>> {
        let mut collection = ArgumentCollection::new(self.role);
        for (name, snapshot) in &self.entries {
            let id = (0..I::COUNT)
                .filter_map(I::from_index)
                .find(|id| id.name() == name)
                .ok_or_else(|| {
                    Error::with_detail(
                        ErrorKind::UndefinedArgumentId,
                        name.as_str(),
                        "no such argument in this collection",
                    )
                })?;
            collection.set_table(id, snapshot.restore()?);
        }
        Ok(collection)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Algorithm parameters: plain data with a validation pass
pub trait Parameter:
    Clone + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn check(&self) -> Status {
        Status::ok()
    }
}
