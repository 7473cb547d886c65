//! Typed access to argument collections

use numtab_core::{
    argument_ids, Argument, ArgumentCollection, ArgumentId, ArgumentRole, ErrorKind,
    HomogenNumericTable, TableExt, TableRef,
};
use std::sync::Arc;

argument_ids! {
    pub enum ModelInput {
        Data => "data",
        Model => "model",
        Batches => "batches",
    }
}

#[derive(Debug, PartialEq)]
struct Model {
    weights: Vec<f64>,
}

fn table() -> TableRef<'static> {
    HomogenNumericTable::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0])
        .unwrap()
        .into_shared()
}

#[test]
fn test_each_variant_narrows_to_its_own_type() {
    let mut input = ArgumentCollection::new(ArgumentRole::Input);
    input.set_table(ModelInput::Data, table());
    input.set_object(ModelInput::Model, Arc::new(Model { weights: vec![0.5] }));
    input.set(
        ModelInput::Batches,
        Argument::Collection(vec![Argument::Table(table()), Argument::Table(table())]),
    );

    assert_eq!(input.table(ModelInput::Data).unwrap().rows(), 2);
    assert_eq!(input.object::<Model>(ModelInput::Model).unwrap().weights, vec![0.5]);
    assert_eq!(input.collection(ModelInput::Batches).unwrap().len(), 2);

    let err = input.table(ModelInput::Model).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectTypeOfInput);
    assert_eq!(err.argument(), Some("model"));

    let err = input.object::<String>(ModelInput::Model).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectTypeOfInput);

    let err = input.object::<Model>(ModelInput::Data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectTypeOfInput);
    assert_eq!(err.argument(), Some("data"));
}

#[test]
fn test_missing_slot_kind_follows_role() {
    let input = ArgumentCollection::<ModelInput>::new(ArgumentRole::Input);
    let err = input.table(ModelInput::Data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullInputNumericTable);
    assert_eq!(err.argument(), Some("data"));

    let result = ArgumentCollection::<ModelInput>::new(ArgumentRole::Result);
    assert_eq!(
        result.table(ModelInput::Data).unwrap_err().kind(),
        ErrorKind::NullResult
    );
}

#[test]
fn test_index_access_is_bounded() {
    let mut input = ArgumentCollection::<ModelInput>::new(ArgumentRole::Input);
    input.set_by_index(0, Argument::Table(table())).unwrap();
    assert!(input.is_set(ModelInput::Data));
    assert!(input.get_by_index(2).unwrap().is_none());

    let err = input.set_by_index(ModelInput::COUNT, Argument::Table(table())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedArgumentId);
}

#[test]
fn test_shared_table_is_not_writable_through_collection() {
    let shared = table();
    let mut result = ArgumentCollection::new(ArgumentRole::Result);
    result.set_table(ModelInput::Data, shared.clone());
    assert_eq!(
        result.table_mut(ModelInput::Data).unwrap_err().kind(),
        ErrorKind::ReadOnlyNumericTable
    );

    drop(shared);
    result
        .table_mut(ModelInput::Data)
        .unwrap()
        .write_from::<f64>(0..1, 0..2, &[9.0, 9.0])
        .unwrap();
    assert_eq!(
        result.table(ModelInput::Data).unwrap().read_rows::<f64>(0..1).unwrap().into_vec(),
        vec![9.0, 9.0]
    );
}
