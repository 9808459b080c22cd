//! Model selection stage
//!
//! Every candidate family is grid-searched with stratified cross-validation,
//! refit on the full training split and scored on the test split. The best
//! test score wins; earlier candidates win ties.

use crate::artifact::{ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerArtifact};
use crate::config::ModelTrainerConfig;
use crate::error::{PhishnetError, Result, Stage, StageContext};
use crate::tracking::{ExperimentTracker, NoopTracker, TrackedRun};
use crate::transformation::Preprocessor;
use crate::utils::{load_array, load_object, Timer};
use ndarray::{s, Array1, Array2};
use serde::Serialize;
use tracing::{info, info_span};

use super::candidates::{EstimatorSpec, ModelCandidate};
use super::estimator::TrainedModel;
use super::metrics::get_classification_score;
use super::network_model::NetworkModel;
use super::search::GridSearch;

/// How one candidate fared
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub name: String,
    pub best_spec: EstimatorSpec,
    pub cv_score: f64,
    pub test_score: f64,
}

/// Scores of every candidate, in menu order, and the index of the winner
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub candidates: Vec<CandidateReport>,
    pub best_index: usize,
}

impl SelectionReport {
    pub fn best(&self) -> &CandidateReport {
        &self.candidates[self.best_index]
    }
}

/// Model trainer stage
pub struct ModelTrainer {
    config: ModelTrainerConfig,
    transformation_artifact: DataTransformationArtifact,
    tracker: Box<dyn ExperimentTracker>,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig, transformation_artifact: DataTransformationArtifact) -> Self {
        Self {
            config,
            transformation_artifact,
            tracker: Box::new(NoopTracker),
        }
    }

    pub fn with_tracker(mut self, tracker: Box<dyn ExperimentTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn config(&self) -> &ModelTrainerConfig {
        &self.config
    }

    fn search(&self) -> GridSearch {
        GridSearch::new(self.config.cv_folds)
            .with_metric(self.config.selection_metric)
            .with_random_state(self.config.random_state)
    }

    /// Search, refit and test-score every candidate. Returns the report and
    /// the refit winner.
    pub fn evaluate_models(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
        candidates: &[ModelCandidate],
    ) -> Result<(SelectionReport, TrainedModel)> {
        if candidates.is_empty() {
            return Err(PhishnetError::SelectionError("the candidate menu is empty".to_string()));
        }

        let search = self.search();
        let mut reports = Vec::with_capacity(candidates.len());
        let mut best: Option<(usize, TrainedModel)> = None;

        for candidate in candidates {
            let timer = Timer::start();
            let result = search.search(candidate, x_train, y_train)?;
            let model = result.best_spec.fit(x_train, y_train, self.config.random_state)?;
            let y_pred = model.predict(x_test)?;
            let test_score = self.config.selection_metric.score(y_test, &y_pred)?;

            info!(
                candidate = candidate.name(),
                params = %result.best_spec,
                cv_score = result.best_score,
                test_score,
                elapsed_secs = timer.elapsed_secs(),
                "evaluated candidate"
            );

            let idx = reports.len();
            reports.push(CandidateReport {
                name: candidate.name().to_string(),
                best_spec: result.best_spec,
                cv_score: result.best_score,
                test_score,
            });

            let improves = match &best {
                Some((best_idx, _)) => test_score > reports[*best_idx].test_score,
                None => true,
            };
            if improves {
                best = Some((idx, model));
            }
        }

        let (best_index, model) =
            best.ok_or_else(|| PhishnetError::SelectionError("no candidate was evaluated".to_string()))?;
        Ok((
            SelectionReport {
                candidates: reports,
                best_index,
            },
            model,
        ))
    }

    /// Pick the best candidate, bundle it with the fitted preprocessor, persist
    /// it and report train and test metrics.
    pub fn select_best_model(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<ModelTrainerArtifact> {
        let (report, model) = self.evaluate_models(x_train, y_train, x_test, y_test, &self.config.candidates)?;
        let best = report.best();
        info!(
            model = %best.name,
            params = %best.best_spec,
            score = best.test_score,
            metric = self.config.selection_metric.name(),
            "selected best model"
        );

        let train_metric = get_classification_score(y_train, &model.predict(x_train)?)?;
        let test_metric = get_classification_score(y_test, &model.predict(x_test)?)?;

        let preprocessor: Preprocessor = load_object(&self.transformation_artifact.transformed_object_file_path)?;
        let network_model = NetworkModel::new(preprocessor, model);
        network_model.save(&self.config.trained_model_file_path)?;

        let params = best.best_spec.params();
        self.track(&best.name, "train", params.clone(), train_metric)?;
        self.track(&best.name, "test", params, test_metric)?;

        Ok(ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            train_metric_artifact: train_metric,
            test_metric_artifact: test_metric,
        })
    }

    fn track(
        &self,
        model_name: &str,
        split: &str,
        params: serde_json::Value,
        metrics: ClassificationMetricArtifact,
    ) -> Result<()> {
        let run = TrackedRun::new(
            format!("{} ({})", model_name, split),
            params,
            metrics,
            &self.config.trained_model_file_path,
        );
        self.tracker.log_run(&run)
    }

    /// Load the transformed matrices (target in the last column) and select a model
    pub fn initiate_model_trainer(&self) -> Result<ModelTrainerArtifact> {
        let _span = info_span!("model_trainer").entered();
        self.run().in_stage(Stage::ModelTrainer)
    }

    fn run(&self) -> Result<ModelTrainerArtifact> {
        let train_arr = load_array(&self.transformation_artifact.transformed_train_file_path)?;
        let test_arr = load_array(&self.transformation_artifact.transformed_test_file_path)?;

        let (x_train, y_train) = split_last_column(&train_arr)?;
        let (x_test, y_test) = split_last_column(&test_arr)?;

        let artifact = self.select_best_model(&x_train, &y_train, &x_test, &y_test)?;
        info!(
            train_f1 = artifact.train_metric_artifact.f1_score,
            test_f1 = artifact.test_metric_artifact.f1_score,
            "model trainer finished"
        );
        Ok(artifact)
    }
}

fn split_last_column(arr: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    if arr.ncols() < 2 {
        return Err(PhishnetError::ShapeError {
            expected: "at least one feature column and a target column".to_string(),
            actual: format!("{} columns", arr.ncols()),
        });
    }
    let last = arr.ncols() - 1;
    Ok((arr.slice(s![.., ..last]).to_owned(), arr.column(last).to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imputation::KNNImputer;
    use crate::tracking::LocalTracker;
    use crate::training::decision_tree::Criterion;
    use crate::utils::save_object;
    use ndarray::array;

    fn dataset(n: usize, offset: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let k = i + offset;
            match j {
                0 => (k % 10) as f64,
                1 => ((k * 7) % 5) as f64,
                _ => (k % 3) as f64,
            }
        });
        let y = x.column(0).mapv(|v| if v >= 5.0 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn small_menu() -> Vec<ModelCandidate> {
        vec![
            ModelCandidate::LogisticRegression,
            ModelCandidate::DecisionTree {
                criterion: vec![Criterion::Gini, Criterion::Entropy],
            },
            ModelCandidate::RandomForest { n_estimators: vec![8] },
        ]
    }

    fn trainer(dir: &std::path::Path) -> ModelTrainer {
        let (x, _) = dataset(60, 0);
        let mut pre = Preprocessor::new(vec!["a".into(), "b".into(), "c".into()], KNNImputer::new(3));
        pre.fit(&x).unwrap();
        let object_path = dir.join("preprocessing.bin");
        save_object(&object_path, &pre).unwrap();

        let artifact = DataTransformationArtifact {
            transformed_object_file_path: object_path,
            transformed_train_file_path: dir.join("train.bin"),
            transformed_test_file_path: dir.join("test.bin"),
        };
        let config = ModelTrainerConfig::new(dir).with_candidates(small_menu());
        ModelTrainer::new(config, artifact)
    }

    #[test]
    fn test_evaluate_models_reports_every_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        let (x_train, y_train) = dataset(60, 0);
        let (x_test, y_test) = dataset(20, 3);

        let (report, model) = t
            .evaluate_models(&x_train, &y_train, &x_test, &y_test, &small_menu())
            .unwrap();
        assert_eq!(report.candidates.len(), 3);
        assert_eq!(report.candidates[0].name, "Logistic Regression");
        assert!(report
            .candidates
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.test_score) && (0.0..=1.0).contains(&c.cv_score)));

        let max = report.candidates.iter().map(|c| c.test_score).fold(f64::MIN, f64::max);
        assert_eq!(report.best().test_score, max);
        let first_max = report.candidates.iter().position(|c| c.test_score == max).unwrap();
        assert_eq!(report.best_index, first_max);
        assert_eq!(model.family(), report.best().name);
    }

    #[test]
    fn test_empty_menu_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        let (x, y) = dataset(30, 0);
        assert!(matches!(
            t.evaluate_models(&x, &y, &x, &y, &[]),
            Err(PhishnetError::SelectionError(_))
        ));
    }

    #[test]
    fn test_failing_candidate_aborts_selection() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        let (x, y) = dataset(30, 0);
        let menu = vec![
            ModelCandidate::LogisticRegression,
            ModelCandidate::RandomForest { n_estimators: vec![] },
        ];
        assert!(t.evaluate_models(&x, &y, &x, &y, &menu).is_err());
    }

    #[test]
    fn test_initiate_model_trainer_persists_and_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let tracker_dir = dir.path().join("mlruns");
        let t = trainer(dir.path()).with_tracker(Box::new(LocalTracker::new(&tracker_dir)));

        let (x_train, y_train) = dataset(60, 0);
        let (x_test, y_test) = dataset(20, 3);
        let train_arr = ndarray::concatenate![ndarray::Axis(1), x_train, y_train.insert_axis(ndarray::Axis(1))];
        let test_arr = ndarray::concatenate![ndarray::Axis(1), x_test, y_test.clone().insert_axis(ndarray::Axis(1))];
        save_object(dir.path().join("train.bin"), &train_arr).unwrap();
        save_object(dir.path().join("test.bin"), &test_arr).unwrap();

        let artifact = t.initiate_model_trainer().unwrap();
        assert!(artifact.trained_model_file_path.exists());
        assert!((0.0..=1.0).contains(&artifact.test_metric_artifact.f1_score));

        let runs = LocalTracker::new(&tracker_dir).load_runs().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].run_name.ends_with("(train)"));
        assert_eq!(runs[1].metrics, artifact.test_metric_artifact);

        let model = NetworkModel::load(&artifact.trained_model_file_path).unwrap();
        let preds = model.predict_array(&x_test).unwrap();
        assert_eq!(
            get_classification_score(&y_test, &preds).unwrap(),
            artifact.test_metric_artifact
        );
    }

    #[test]
    fn test_split_last_column() {
        let arr = array![[1.0, 2.0, 0.0], [3.0, 4.0, 1.0]];
        let (x, y) = split_last_column(&arr).unwrap();
        assert_eq!(x, array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(y, array![0.0, 1.0]);
        assert!(split_last_column(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_stage_error_when_arrays_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = trainer(dir.path()).initiate_model_trainer().unwrap_err();
        assert_eq!(err.stage(), Some(Stage::ModelTrainer));
    }
}
