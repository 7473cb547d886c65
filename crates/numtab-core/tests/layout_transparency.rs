//! The same logical matrix reads the same through every layout

mod common;

use common::{all_layouts, columns_of, grid_4x3, random_matrix};
use numtab_core::{
    CsrNumericTable, ErrorKind, HomogenNumericTable, IndexBase, MergedNumericTable,
    NumericTable, SoaNumericTable, TableExt, TableLayout,
};
use proptest::prelude::*;

#[test]
fn test_grid_sub_block_in_every_layout() {
    for table in all_layouts(4, 3, &grid_4x3()) {
        let block = table.read_block::<f64>(1..3, 1..3).unwrap();
        assert_eq!(&*block, &[5.0, 6.0, 8.0, 9.0], "{:?}", table.layout());
        assert_eq!(block.row(0), Some(&[5.0, 6.0][..]));
    }
}

#[test]
fn test_layout_tags() {
    let layouts: Vec<TableLayout> = all_layouts(4, 3, &grid_4x3())
        .iter()
        .map(|t| t.layout())
        .collect();
    assert_eq!(
        layouts,
        vec![TableLayout::RowMajor, TableLayout::ColumnMajor, TableLayout::Csr]
    );
}

#[test]
fn test_mixed_type_soa_reads_as_f64() {
    let mut soa = SoaNumericTable::from_columns(3, vec![vec![1.0f64, 2.0, 3.0]]).unwrap();
    let mut wide = SoaNumericTable::not_allocated(3, 3, numtab_core::DataType::F64);
    wide.set_column(0, vec![1.0f64, 2.0, 3.0]).unwrap();
    wide.set_column(1, vec![4.0f32, 5.0, 6.0]).unwrap();
    wide.set_column(2, vec![7i32, 8, 9]).unwrap();
    let block = wide.read_all::<f64>().unwrap();
    assert_eq!(&*block, &[1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);

    soa.write_from::<f64>(1..2, 0..1, &[20.0]).unwrap();
    assert_eq!(soa.column::<f64>(0), Some(&[1.0, 20.0, 3.0][..]));
}

#[test]
fn test_merged_table_matches_dense() {
    let values = grid_4x3();
    let cols = columns_of(4, 3, &values);
    let left = HomogenNumericTable::from_vec(
        4,
        1,
        cols[0].clone(),
    )
    .unwrap()
    .into_shared();
    let right = SoaNumericTable::from_columns(4, cols[1..].to_vec())
        .unwrap()
        .into_shared();
    let mut merged = MergedNumericTable::new(vec![left, right]).unwrap();
    assert_eq!(merged.columns(), 3);
    assert_eq!(merged.read_all::<f64>().unwrap().into_vec(), values);
    assert_eq!(
        merged.write_rows::<f64>(0..1).unwrap_err().kind(),
        ErrorKind::ReadOnlyNumericTable
    );
}

#[test]
fn test_writes_land_in_every_layout() {
    let zeros = vec![0.0; 12];
    let mut dense = HomogenNumericTable::from_vec(4, 3, zeros.clone()).unwrap();
    let mut soa = SoaNumericTable::from_columns(4, columns_of(4, 3, &zeros)).unwrap();
    let mut csr = CsrNumericTable::<f64>::empty(4, 3, IndexBase::Zero).unwrap();

    let tables: [&mut dyn NumericTable; 3] = [&mut dense, &mut soa, &mut csr];
    for table in tables {
        table.write_from::<f64>(1..3, 1..3, &[5.0, 6.0, 8.0, 9.0]).unwrap();
        assert_eq!(
            table.read_all::<f64>().unwrap().into_vec(),
            vec![0.0, 0.0, 0.0, 0.0, 5.0, 6.0, 0.0, 8.0, 9.0, 0.0, 0.0, 0.0]
        );
    }
    assert_eq!(csr.nnz(), 4);
}

proptest! {
    #[test]
    fn prop_layouts_agree(
        seed in any::<u64>(),
        rows in 1usize..12,
        columns in 1usize..6,
        r0 in 0usize..12,
        c0 in 0usize..6,
    ) {
        let values = random_matrix(seed, rows, columns, 0.3);
        let r0 = r0 % rows;
        let c0 = c0 % columns;
        let tables = all_layouts(rows, columns, &values);
        let expected = tables[0].read_block::<f64>(r0..rows, c0..columns).unwrap().into_vec();
        for table in &tables[1..] {
            let block = table.read_block::<f64>(r0..rows, c0..columns).unwrap();
            prop_assert_eq!(&*block, expected.as_slice());
        }
    }
}
