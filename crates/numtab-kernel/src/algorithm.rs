//! Kernel-function algorithm descriptor, batch mode only

use crate::factories::REGISTRY;
use crate::kernels::PairwiseKernel;
use crate::types::{InputId, KernelParameter, Method, ResultId};
use numtab_core::{
    AlgorithmDescriptor, ArgumentCollection, ArgumentRole, BatchMode, ErrorKind, ErrorRecord,
    HomogenNumericTable, KernelRegistry, NumericTable, Precision, Result, Status, TableLayout,
};
use tracing::instrument;

/// Marker type naming the kernel-function family
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelFunction;

/// Kernel values of two tables in one `compute()`
pub type KernelFunctionBatch<'a> = numtab_core::Batch<'a, KernelFunction>;

impl AlgorithmDescriptor for KernelFunction {
    const NAME: &'static str = "kernel_function";
    type Method = Method;
    type Parameter = KernelParameter;
    type InputId = InputId;
    type ResultId = ResultId;
    type Kernel = dyn PairwiseKernel;

    fn registry() -> &'static KernelRegistry<Method, dyn PairwiseKernel> {
        &REGISTRY
    }

    fn check_input(
        input: &ArgumentCollection<'_, InputId>,
        parameter: &KernelParameter,
        method: Method,
    ) -> Status {
        let status = input.check_table(InputId::X, None, None)
            | input.check_table(InputId::Y, None, None);
        if !status.is_ok() {
            return status;
        }
        let (Ok(x), Ok(y)) = (input.table(InputId::X), input.table(InputId::Y)) else {
            return status;
        };
        let mut status = input.check_table(InputId::Y, None, Some(x.columns()));
        status |= parameter.computation_mode.check_rows(x.rows(), y.rows());
        if method == Method::FastCsr {
            for (name, table) in [("x", x), ("y", y)] {
                status |= Status::ensure(table.layout() == TableLayout::Csr, || {
                    ErrorRecord::new(ErrorKind::IncorrectTypeOfInput)
                        .with_argument(name)
                        .with_detail(format!(
                            "fast CSR method needs a CSR table, got {:?}",
                            table.layout()
                        ))
                });
            }
        }
        status
    }
}

impl BatchMode for KernelFunction {
    fn allocate_result(
        input: &ArgumentCollection<'_, InputId>,
        parameter: &KernelParameter,
        precision: Precision,
    ) -> Result<ArgumentCollection<'static, ResultId>> {
        let (x, y) = (input.table(InputId::X)?, input.table(InputId::Y)?);
        let (rows_x, rows_y) = parameter.computation_mode.row_ranges(x.rows(), y.rows());
        let mut result = ArgumentCollection::new(ArgumentRole::Result);
        numtab_core::dispatch_precision!(precision, T => {
            result.set_table(
                ResultId::Values,
                HomogenNumericTable::<T>::allocated(rows_x.len(), rows_y.len())?.into_shared(),
            );
        });
        Ok(result)
    }

    #[instrument(skip_all, fields(backend = kernel.backend_name(), mode = ?parameter.computation_mode))]
    fn compute(
        kernel: &dyn PairwiseKernel,
        input: &ArgumentCollection<'_, InputId>,
        parameter: &KernelParameter,
        result: &mut ArgumentCollection<'static, ResultId>,
    ) -> Result<()> {
        let x = input.table(InputId::X)?;
        let y = input.table(InputId::Y)?;
        kernel.compute(x.as_ref(), y.as_ref(), parameter, result)
    }
}
