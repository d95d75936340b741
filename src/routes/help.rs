use crate::models::job::GraphFeature;

/// GET /help: Plain-text summary of the API.
pub async fn help() -> String {
    format!(
        "\
Fraud analysis job service

Dataset
  POST   /data                        load the transaction dataset
  GET    /data                        return every dataset row
  DELETE /data                        delete the dataset
  GET    /data/view?offset=N&limit=M  return M rows starting at row N (defaults 0 and 5)

Jobs
  POST   /jobs                        submit a job; the JSON body has exactly one key:
                                        {{\"graph_feature\": <one of [{features}]>}}
                                        {{\"transactions\": [<transaction>, ...]}}
  GET    /jobs                        list job ids, oldest first
  DELETE /jobs                        delete all jobs and results
  GET    /jobs/<job_id>               job status and request
  GET    /results/<job_id>            result of a completed job (PNG plot or JSON predictions)

Transaction fields
  trans_date_trans_time (\"dd/mm/YYYY HH:MM\"), merchant, category, amt, lat, long,
  job, merch_lat, merch_long

Service
  GET    /health                      Redis connectivity
  GET    /metrics                     Prometheus metrics
  GET    /help                        this text
",
        features = GraphFeature::names().join(", ")
    )
}
