mod mock_sink;
mod pipeline;
