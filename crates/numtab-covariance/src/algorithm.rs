//! Covariance algorithm descriptor and its computation modes

use crate::factories::REGISTRY;
use crate::kernels::CovarianceKernel;
use crate::types::{CovarianceParameter, InputId, Method, PartialId, ResultId};
use numtab_core::{
    AlgorithmDescriptor, ArgumentCollection, ArgumentRole, BatchMode, ErrorKind, ErrorRecord,
    FeatureKind, HomogenNumericTable, KernelRegistry, NumericTable, PartialMode, Precision, Result,
    Status, TableLayout,
};
use tracing::{debug, instrument};

/// Marker type naming the covariance family
#[derive(Debug, Clone, Copy, Default)]
pub struct Covariance;

/// Batch covariance over one table
pub type CovarianceBatch<'a> = numtab_core::Batch<'a, Covariance>;
/// Covariance over data arriving in row chunks
pub type CovarianceOnline<'a> = numtab_core::Online<'a, Covariance>;
pub type CovarianceStep1Local<'a> = numtab_core::DistributedStep1Local<'a, Covariance>;
pub type CovarianceStep2Master = numtab_core::DistributedStep2Master<Covariance>;

impl AlgorithmDescriptor for Covariance {
    const NAME: &'static str = "covariance";
    type Method = Method;
    type Parameter = CovarianceParameter;
    type InputId = InputId;
    type ResultId = ResultId;
    type Kernel = dyn CovarianceKernel;

    fn registry() -> &'static KernelRegistry<Method, dyn CovarianceKernel> {
        &REGISTRY
    }

    fn check_input(
        input: &ArgumentCollection<'_, InputId>,
        _: &CovarianceParameter,
        method: Method,
    ) -> Status {
        let mut status = input.check_table(InputId::Data, None, None);
        if !status.is_ok() {
            return status;
        }
        let Ok(data) = input.table(InputId::Data) else {
            return status;
        };
        status |= Status::ensure(data.rows() > 0, || {
            ErrorRecord::new(ErrorKind::IncorrectNumberOfRows)
                .with_argument("data")
                .with_detail("table has no rows")
        });
        status |= Status::ensure(data.columns() > 0, || {
            ErrorRecord::new(ErrorKind::IncorrectNumberOfColumns)
                .with_argument("data")
                .with_detail("table has no columns")
        });
        for (c, feature) in data.dictionary().iter().enumerate() {
            status |= Status::ensure(feature.kind != FeatureKind::Categorical, || {
                ErrorRecord::new(ErrorKind::IncorrectFeatureKind)
                    .with_argument("data")
                    .with_detail(format!("feature {c} is categorical"))
            });
        }
        if method == Method::FastCsr {
            status |= Status::ensure(data.layout() == TableLayout::Csr, || {
                ErrorRecord::new(ErrorKind::IncorrectTypeOfInput)
                    .with_argument("data")
                    .with_detail(format!("fast CSR method needs a CSR table, got {:?}", data.layout()))
            });
        }
        status
    }
}

impl BatchMode for Covariance {
    fn allocate_result(
        input: &ArgumentCollection<'_, InputId>,
        _: &CovarianceParameter,
        precision: Precision,
    ) -> Result<ArgumentCollection<'static, ResultId>> {
        let p = input.table(InputId::Data)?.columns();
        let mut result = ArgumentCollection::new(ArgumentRole::Result);
        numtab_core::dispatch_precision!(precision, T => {
            result.set_table(
                ResultId::Covariance,
                HomogenNumericTable::<T>::allocated(p, p)?.into_shared(),
            );
            result.set_table(
                ResultId::Mean,
                HomogenNumericTable::<T>::allocated(1, p)?.into_shared(),
            );
        });
        Ok(result)
    }

    #[instrument(skip_all, fields(backend = kernel.backend_name()))]
    fn compute(
        kernel: &dyn CovarianceKernel,
        input: &ArgumentCollection<'_, InputId>,
        parameter: &CovarianceParameter,
        result: &mut ArgumentCollection<'static, ResultId>,
    ) -> Result<()> {
        let data = input.table(InputId::Data)?;
        debug!(rows = data.rows(), columns = data.columns(), "batch covariance");
        kernel.compute(data.as_ref(), parameter, result)
    }
}

impl PartialMode for Covariance {
    type PartialId = PartialId;

    #[instrument(skip_all, fields(backend = kernel.backend_name()))]
    fn compute_partial(
        kernel: &dyn CovarianceKernel,
        input: &ArgumentCollection<'_, InputId>,
        parameter: &CovarianceParameter,
    ) -> Result<ArgumentCollection<'static, PartialId>> {
        let data = input.table(InputId::Data)?;
        debug!(rows = data.rows(), "covariance partial");
        kernel.compute_partial(data.as_ref(), parameter)
    }

    fn merge_partials(
        kernel: &dyn CovarianceKernel,
        accumulated: &ArgumentCollection<'static, PartialId>,
        next: &ArgumentCollection<'static, PartialId>,
        _: &CovarianceParameter,
    ) -> Result<ArgumentCollection<'static, PartialId>> {
        kernel.merge_partials(accumulated, next)
    }

    #[instrument(skip_all)]
    fn finalize(
        kernel: &dyn CovarianceKernel,
        partial: &ArgumentCollection<'static, PartialId>,
        parameter: &CovarianceParameter,
    ) -> Result<ArgumentCollection<'static, ResultId>> {
        kernel.finalize(partial, parameter)
    }

    fn check_partial(
        partial: &ArgumentCollection<'static, PartialId>,
        _: &CovarianceParameter,
    ) -> Status {
        let columns = partial.table(PartialId::Sum).ok().map(|sum| sum.columns());
        partial.check_table(PartialId::NObservations, Some(1), Some(1))
            | partial.check_table(PartialId::Sum, Some(1), None)
            | partial.check_table(PartialId::CrossProduct, columns, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numtab_core::{CpuTier, Dispatcher, SoaNumericTable, TableExt, TableRef};

    fn data() -> TableRef<'static> {
        HomogenNumericTable::from_vec(3, 2, vec![1.0, 2.0, 2.0, 4.0, 3.0, 9.0])
            .unwrap()
            .into_shared()
    }

    fn batch(method: Method) -> CovarianceBatch<'static> {
        CovarianceBatch::with_dispatcher(&Dispatcher::fixed(CpuTier::Baseline), Precision::F64, method)
            .unwrap()
    }

    #[test]
    fn test_batch_result_shapes() {
        let mut batch = batch(Method::Dense);
        batch.set_input(InputId::Data, data());
        batch.compute().unwrap();
        let cov = batch.result_table(ResultId::Covariance).unwrap();
        assert_eq!((cov.rows(), cov.columns()), (2, 2));
        let mean = batch.result_table(ResultId::Mean).unwrap();
        assert_eq!(mean.read_all::<f64>().unwrap().into_vec(), vec![2.0, 5.0]);
        // x = 1 2 3 and y = 2 4 9: var x = 1, cov = 3.5, var y = 13
        assert_eq!(cov.read_all::<f64>().unwrap().into_vec(), vec![1.0, 3.5, 3.5, 13.0]);
    }

    #[test]
    fn test_f32_results_are_f32_tables() {
        let mut batch =
            CovarianceBatch::with_dispatcher(&Dispatcher::fixed(CpuTier::Baseline), Precision::F32, Method::Dense)
                .unwrap();
        batch.set_input(InputId::Data, data());
        batch.compute().unwrap();
        let cov = batch.result_table(ResultId::Covariance).unwrap();
        assert_eq!(cov.dictionary().is_homogeneous(), Some(numtab_core::DataType::F32));
    }

    #[test]
    fn test_categorical_and_layout_checks_collect() {
        let mut soa = SoaNumericTable::from_columns(2, vec![vec![1.0f64, 2.0], vec![0.0, 1.0]]).unwrap();
        soa.dictionary_mut().set_feature_kind(1, FeatureKind::Categorical).unwrap();
        let mut batch = batch(Method::FastCsr);
        batch.set_input(InputId::Data, soa.into_shared());
        let status = batch.check();
        assert!(status.contains(ErrorKind::IncorrectFeatureKind));
        assert!(status.contains(ErrorKind::IncorrectTypeOfInput));
        assert_eq!(status.len(), 2);
    }

    #[test]
    fn test_empty_table_rejected() {
        let mut batch = batch(Method::Dense);
        batch.set_input(
            InputId::Data,
            HomogenNumericTable::<f64>::from_vec(0, 2, Vec::new()).unwrap().into_shared(),
        );
        let err = batch.compute().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectNumberOfRows);
        assert_eq!(err.argument(), Some("data"));
    }

    #[test]
    fn test_partial_shapes_checked() {
        let mut partial = ArgumentCollection::new(ArgumentRole::PartialResult);
        partial.set_table(
            PartialId::Sum,
            HomogenNumericTable::<f64>::allocated(1, 3).unwrap().into_shared(),
        );
        partial.set_table(
            PartialId::CrossProduct,
            HomogenNumericTable::<f64>::allocated(2, 2).unwrap().into_shared(),
        );
        let status = Covariance::check_partial(&partial, &CovarianceParameter::default());
        assert!(status.contains(ErrorKind::NullPartialResult));
        assert!(status.contains(ErrorKind::IncorrectNumberOfRows));
        assert!(status.contains(ErrorKind::IncorrectNumberOfColumns));
    }
}
